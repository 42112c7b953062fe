use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::simulation::config;
use crate::simulation::events::{EventsManager, LinkEnterEventBuilder};
use crate::simulation::id::Id;
use crate::simulation::network::link::SimLink;
use crate::simulation::network::{Link, Network};
use crate::simulation::vehicles::SimVehicle;

/// Steps all links of the network once per simulated second. Owns the runtime
/// link state; the static network is shared and read-only.
pub struct NetworkEngine {
    network: Arc<Network>,
    links: Vec<SimLink>,
    events: Rc<RefCell<EventsManager>>,
}

impl NetworkEngine {
    pub fn new(
        network: Arc<Network>,
        config: &config::Simulation,
        events: Rc<RefCell<EventsManager>>,
    ) -> Self {
        let links = network
            .links
            .iter()
            .map(|link| SimLink::from_link(link, network.effective_cell_size, config))
            .collect();
        NetworkEngine {
            network,
            links,
            events,
        }
    }

    /// Places a vehicle on a link. The exit time is derived from link length
    /// and the slower of link free speed and vehicle maximum speed; stop
    /// handling on the link may advance it further.
    pub fn receive_veh(&mut self, mut vehicle: SimVehicle, link_id: &Id<Link>, now: u32) {
        let link = self.network.get_link(link_id);
        let speed = link.freespeed.min(vehicle.max_v);
        let duration = 1.max((link.length / speed as f64) as u32);
        vehicle.earliest_link_exit_time = now + duration;
        vehicle.curr_link = Some(link_id.clone());

        let mut events = self.events.borrow_mut();
        events.publish_event(
            &LinkEnterEventBuilder::default()
                .vehicle(vehicle.id.clone())
                .link(link_id.clone())
                .time(now)
                .build()
                .unwrap(),
        );
        self.links[link_id.internal() as usize].push_veh(vehicle, now, &mut events);
    }

    /// Puts a vehicle back on its current link for another attempt in the next
    /// time step, e.g. when the downstream link has no storage left. The
    /// vehicle joins at the back of the queue.
    pub fn retain_veh(&mut self, mut vehicle: SimVehicle, now: u32) {
        let link_id = vehicle
            .curr_link()
            .expect("cannot retain a vehicle that is not on a link")
            .clone();
        vehicle.earliest_link_exit_time = now + 1;
        self.links[link_id.internal() as usize].push_veh(
            vehicle,
            now,
            &mut self.events.borrow_mut(),
        );
    }

    /// Advances all links by one step and returns the vehicles that may leave
    /// their link now, under flow-capacity restrictions.
    pub fn move_links(&mut self, now: u32) -> Vec<SimVehicle> {
        let mut events = self.events.borrow_mut();
        let mut exited = Vec::new();
        for link in self.links.iter_mut() {
            link.do_sim_step(now, &mut events);
            while let Some(vehicle) = link.pop_veh() {
                exited.push(vehicle);
            }
        }
        exited
    }

    pub fn is_available(&self, link_id: &Id<Link>) -> bool {
        self.links[link_id.internal() as usize].is_available()
    }

    pub fn link(&self, link_id: &Id<Link>) -> &SimLink {
        &self.links[link_id.internal() as usize]
    }

    pub fn on_iteration_start(&mut self) {
        for link in self.links.iter_mut() {
            link.clear_runtime_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn vehicle_traverses_a_link() {
        let (network, a, _) = test_utils::two_link_network();
        let network = Arc::new(network);
        let events = Rc::new(RefCell::new(EventsManager::new()));
        let mut engine = NetworkEngine::new(network, &test_utils::config(), events);

        let veh = SimVehicle::new(Id::new(0, "veh-1"), 10.0, 1.0);
        engine.receive_veh(veh, &a, 0);

        // 80m at 10m/s: ready after 8 seconds
        for now in 0..8 {
            assert!(engine.move_links(now).is_empty(), "left early at {now}");
        }
        let exited = engine.move_links(8);
        assert_eq!(1, exited.len());
        assert_eq!(Some(&a), exited[0].curr_link());
    }

    #[test]
    fn iteration_start_clears_link_state() {
        let (network, a, _) = test_utils::two_link_network();
        let network = Arc::new(network);
        let events = Rc::new(RefCell::new(EventsManager::new()));
        let mut engine = NetworkEngine::new(network, &test_utils::config(), events);

        engine.receive_veh(SimVehicle::new(Id::new(0, "veh-1"), 10.0, 1.0), &a, 0);
        assert_eq!(1, engine.link(&a).veh_count());

        engine.on_iteration_start();
        assert_eq!(0, engine.link(&a).veh_count());
        assert!(engine.move_links(0).is_empty());
    }
}
