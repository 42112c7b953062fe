use std::collections::VecDeque;

use crate::simulation::id::Id;
use crate::simulation::network::Link;

/// A vehicle while it is inside this subsystem. The outer simulation owns the
/// vehicle lifecycle; instances only live here while they traverse the queues.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: Id<SimVehicle>,
    pub max_v: f32,
    pub pce: f32,
    /// Earliest simulated time at which the vehicle may leave its current link.
    /// Assigned by the flow model on link entry, advanced by stop handling.
    pub earliest_link_exit_time: u32,
    pub curr_link: Option<Id<Link>>,
    state: VehicleState,
    pub route: VecDeque<Id<Link>>,
    pub stops: Option<StopSchedule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// Following its route, handled by ordinary flow rules.
    Driving,
    SearchingParking,
    Parked,
    /// Terminal state, the vehicle has left this subsystem.
    DepartedParking,
}

impl SimVehicle {
    pub fn new(id: Id<SimVehicle>, max_v: f32, pce: f32) -> Self {
        SimVehicle {
            id,
            max_v,
            pce,
            earliest_link_exit_time: 0,
            curr_link: None,
            state: VehicleState::Driving,
            route: VecDeque::new(),
            stops: None,
        }
    }

    pub fn with_route(mut self, route: Vec<Id<Link>>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_stops(mut self, stops: StopSchedule) -> Self {
        self.stops = Some(stops);
        self
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn curr_link(&self) -> Option<&Id<Link>> {
        self.curr_link.as_ref()
    }

    pub fn begin_search(&mut self) {
        assert_eq!(
            VehicleState::Driving,
            self.state,
            "Vehicle {} cannot start a parking search from state {:?}",
            self.id,
            self.state
        );
        self.state = VehicleState::SearchingParking;
    }

    pub fn park(&mut self, link: &Id<Link>) {
        assert_eq!(
            VehicleState::SearchingParking,
            self.state,
            "Vehicle {} was granted parking without searching",
            self.id
        );
        assert_eq!(
            Some(link),
            self.curr_link.as_ref(),
            "Vehicle {} was granted parking on link {link}, but is on {:?}",
            self.id,
            self.curr_link
        );
        self.state = VehicleState::Parked;
    }

    pub fn depart_parking(&mut self) {
        assert_eq!(
            VehicleState::Parked,
            self.state,
            "Vehicle {} departs from parking without a parked state",
            self.id
        );
        self.state = VehicleState::DepartedParking;
    }
}

/// Ordered stop schedule of a vehicle carrying passengers. Stops are consumed
/// front to back, one per link visit.
#[derive(Debug, Clone)]
pub struct StopSchedule {
    stops: VecDeque<ScheduledStop>,
}

#[derive(Debug, Clone)]
pub struct ScheduledStop {
    pub link: Id<Link>,
    /// Dwell time spent serving the stop.
    pub duration: u32,
    /// A blocking stop keeps the vehicle in the main queue while dwelling.
    pub is_blocking: bool,
}

impl StopSchedule {
    pub fn new(stops: Vec<ScheduledStop>) -> Self {
        StopSchedule {
            stops: stops.into(),
        }
    }

    pub fn next_stop(&self) -> Option<&ScheduledStop> {
        self.stops.front()
    }

    /// Serves the next stop and returns the resulting dwell delay.
    pub fn handle_stop(&mut self, _now: u32) -> u32 {
        let stop = self
            .stops
            .pop_front()
            .expect("handle_stop called without a scheduled stop");
        stop.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> SimVehicle {
        SimVehicle::new(Id::new(0, "veh-1"), 10.0, 1.0)
    }

    #[test]
    fn search_park_depart_cycle() {
        let mut veh = vehicle();
        veh.curr_link = Some(Id::new(0, "link-1"));
        veh.begin_search();
        assert_eq!(VehicleState::SearchingParking, veh.state());

        veh.park(&Id::new(0, "link-1"));
        assert_eq!(VehicleState::Parked, veh.state());

        veh.depart_parking();
        assert_eq!(VehicleState::DepartedParking, veh.state());
    }

    #[test]
    #[should_panic(expected = "without searching")]
    fn park_without_search_is_fatal() {
        let mut veh = vehicle();
        veh.curr_link = Some(Id::new(0, "link-1"));
        veh.park(&Id::new(0, "link-1"));
    }

    #[test]
    #[should_panic(expected = "without a parked state")]
    fn depart_without_parking_is_fatal() {
        let mut veh = vehicle();
        veh.depart_parking();
    }

    #[test]
    fn stop_schedule_is_consumed_in_order() {
        let mut stops = StopSchedule::new(vec![
            ScheduledStop {
                link: Id::new(0, "a"),
                duration: 30,
                is_blocking: false,
            },
            ScheduledStop {
                link: Id::new(1, "b"),
                duration: 10,
                is_blocking: true,
            },
        ]);

        assert_eq!("a", stops.next_stop().unwrap().link.external());
        assert_eq!(30, stops.handle_stop(0));
        assert_eq!("b", stops.next_stop().unwrap().link.external());
        assert_eq!(10, stops.handle_stop(0));
        assert!(stops.next_stop().is_none());
    }
}
