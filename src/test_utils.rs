use std::cell::RefCell;
use std::rc::Rc;

use crate::simulation::config;
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network};
use crate::simulation::parking::{LaneCapacityControl, LaneChange};

pub fn config() -> config::Simulation {
    config::Simulation {
        start_time: 0,
        end_time: 100,
        sample_size: 1.0,
    }
}

/// Two links in a row, both with parking supply: n1 -a-> n2 -b-> n3.
pub fn two_link_network() -> (Network, Id<Link>, Id<Link>) {
    let mut network = Network::new();
    let n1 = network.create_node("n1", 0., 0.);
    let n2 = network.create_node("n2", 80., 0.);
    let n3 = network.create_node("n3", 160., 0.);
    let a = network.create_link("a", &n1, &n2, 80., 3600., 10., 2., false);
    let b = network.create_link("b", &n2, &n3, 80., 3600., 10., 2., false);
    (network, a, b)
}

/// Lane capacity control that records every call, so tests can assert on the
/// issued side effects.
#[derive(Debug, Default, Clone)]
pub struct RecordingLaneControl {
    calls: Rc<RefCell<Vec<(Id<Link>, u32, LaneChange)>>>,
}

impl RecordingLaneControl {
    pub fn calls(&self) -> Vec<(Id<Link>, u32, LaneChange)> {
        self.calls.borrow().clone()
    }
}

impl LaneCapacityControl for RecordingLaneControl {
    fn decrease(&mut self, link: &Id<Link>, now: u32) {
        self.calls.borrow_mut().push((link.clone(), now, LaneChange::Reduce));
    }

    fn increase(&mut self, link: &Id<Link>, now: u32) {
        self.calls.borrow_mut().push((link.clone(), now, LaneChange::Restore));
    }
}
