use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use nohash_hasher::IntMap;
use thiserror::Error;
use tracing::info;

use crate::simulation::config::Config;
use crate::simulation::engines::network_engine::NetworkEngine;
use crate::simulation::events::{
    EventsManager, ParkingAdmittedEventBuilder, ParkingReleasedEventBuilder,
};
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network};
use crate::simulation::parking::route_sampler::RoutingError;
use crate::simulation::parking::{LaneCapacityControl, OnRoadParking, ParkingDecision};
use crate::simulation::vehicles::{SimVehicle, VehicleState};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Per-step orchestration: advances all links, re-merges stop holders, and
/// runs parking decisions for searching vehicles. Driven by an external clock
/// through `step`, or for a whole run through `run`.
pub struct Simulation {
    config: Arc<Config>,
    network: Arc<Network>,
    network_engine: NetworkEngine,
    parking: OnRoadParking,
    events: Rc<RefCell<EventsManager>>,
    parked: IntMap<Id<SimVehicle>, SimVehicle>,
    finished: Vec<SimVehicle>,
}

impl Simulation {
    pub fn new(
        config: Arc<Config>,
        network: Arc<Network>,
        lanes: Box<dyn LaneCapacityControl>,
        events: Rc<RefCell<EventsManager>>,
    ) -> Self {
        let network_engine =
            NetworkEngine::new(network.clone(), &config.simulation, events.clone());
        let parking = OnRoadParking::new(&network, lanes, &config.parking);
        Simulation {
            config,
            network,
            network_engine,
            parking,
            events,
            parked: IntMap::default(),
            finished: Vec::new(),
        }
    }

    pub fn run(&mut self) -> Result<(), SimulationError> {
        let start = self.config.simulation.start_time;
        let end = self.config.simulation.end_time;
        info!("Starting simulation loop from {start} to {end}");
        for now in start..end {
            self.step(now)?;
        }
        self.events.borrow_mut().finish();
        info!(
            "Finished simulation loop. {} vehicles parked, {} finished their route.",
            self.parked.len(),
            self.finished.len()
        );
        Ok(())
    }

    pub fn step(&mut self, now: u32) -> Result<(), SimulationError> {
        for vehicle in self.network_engine.move_links(now) {
            match vehicle.state() {
                VehicleState::SearchingParking => self.handle_parking_search(vehicle, now)?,
                VehicleState::Driving => self.handle_route(vehicle, now),
                state => panic!(
                    "Vehicle {} left a link in unexpected state {state:?}",
                    vehicle.id
                ),
            }
        }
        Ok(())
    }

    /// Hands a vehicle to the subsystem on the given link.
    pub fn spawn_veh(&mut self, vehicle: SimVehicle, link: &Id<Link>, now: u32) {
        self.network_engine.receive_veh(vehicle, link, now);
    }

    /// Departure notification from the outer simulation: releases the
    /// vehicle's parking admission and removes it from this subsystem.
    pub fn depart_vehicle(&mut self, vehicle: &Id<SimVehicle>, now: u32) -> SimVehicle {
        let mut veh = self
            .parked
            .remove(vehicle)
            .unwrap_or_else(|| panic!("Vehicle {vehicle} departs but was never parked"));
        let link = veh
            .curr_link()
            .expect("parked vehicle without a link")
            .clone();
        self.parking.release(&veh.id, &link, now);
        self.events.borrow_mut().publish_event(
            &ParkingReleasedEventBuilder::default()
                .vehicle(veh.id.clone())
                .link(link)
                .time(now)
                .build()
                .unwrap(),
        );
        veh.depart_parking();
        veh
    }

    /// Iteration boundary: all runtime state starts over, parking supply and
    /// the static network are kept.
    pub fn on_iteration_start(&mut self) {
        self.parking.on_iteration_start();
        self.network_engine.on_iteration_start();
        self.parked.clear();
        self.finished.clear();
    }

    fn handle_parking_search(
        &mut self,
        mut vehicle: SimVehicle,
        now: u32,
    ) -> Result<(), SimulationError> {
        match self.parking.parking(&vehicle, &self.network, now)? {
            ParkingDecision::Park(location) => {
                vehicle.park(&location.link);
                self.events.borrow_mut().publish_event(
                    &ParkingAdmittedEventBuilder::default()
                        .vehicle(location.vehicle)
                        .link(location.link)
                        .time(now)
                        .build()
                        .unwrap(),
                );
                self.parked.insert(vehicle.id.clone(), vehicle);
            }
            ParkingDecision::Cruise(next) => {
                self.network_engine.receive_veh(vehicle, &next, now);
            }
        }
        Ok(())
    }

    fn handle_route(&mut self, mut vehicle: SimVehicle, now: u32) {
        match vehicle.route.front().cloned() {
            None => self.finished.push(vehicle),
            Some(next) if self.network_engine.is_available(&next) => {
                vehicle.route.pop_front();
                self.network_engine.receive_veh(vehicle, &next, now);
            }
            // downstream storage is exhausted, try again next step
            Some(_) => self.network_engine.retain_veh(vehicle, now),
        }
    }

    pub fn parking(&self) -> &OnRoadParking {
        &self.parking
    }

    pub fn parked_vehicles(&self) -> impl Iterator<Item = &SimVehicle> {
        self.parked.values()
    }

    pub fn finished_vehicles(&self) -> &[SimVehicle] {
        &self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{self, RecordingLaneControl};

    #[test]
    fn searching_vehicle_parks_on_first_link_with_supply() {
        let (network, a, _) = test_utils::two_link_network();
        let network = Arc::new(network);
        let events = Rc::new(RefCell::new(EventsManager::new()));
        let recorder = RecordingLaneControl::default();
        let mut sim = Simulation::new(
            Arc::new(Config::default()),
            network,
            Box::new(recorder.clone()),
            events,
        );

        let mut veh = SimVehicle::new(Id::new(0, "drt-1"), 10.0, 1.0);
        veh.begin_search();
        sim.spawn_veh(veh, &a, 0);

        for now in 0..10 {
            sim.step(now).unwrap();
        }

        assert_eq!(1, sim.parking().occupancy(&a));
        assert_eq!(1, sim.parked_vehicles().count());
        assert_eq!(1, recorder.calls().len());
    }

    #[test]
    fn departure_releases_the_admission() {
        let (network, a, _) = test_utils::two_link_network();
        let network = Arc::new(network);
        let events = Rc::new(RefCell::new(EventsManager::new()));
        let mut sim = Simulation::new(
            Arc::new(Config::default()),
            network,
            Box::new(RecordingLaneControl::default().clone()),
            events,
        );

        let mut veh = SimVehicle::new(Id::new(0, "drt-1"), 10.0, 1.0);
        veh.begin_search();
        sim.spawn_veh(veh, &a, 0);
        for now in 0..10 {
            sim.step(now).unwrap();
        }
        assert_eq!(1, sim.parking().occupancy(&a));

        let departed = sim.depart_vehicle(&Id::new(0, "drt-1"), 20);
        assert_eq!(VehicleState::DepartedParking, departed.state());
        assert_eq!(0, sim.parking().occupancy(&a));
    }

    #[test]
    #[should_panic(expected = "never parked")]
    fn departure_without_parked_record_is_fatal() {
        let (network, _, _) = test_utils::two_link_network();
        let mut sim = Simulation::new(
            Arc::new(Config::default()),
            Arc::new(network),
            Box::new(RecordingLaneControl::default()),
            Rc::new(RefCell::new(EventsManager::new())),
        );
        sim.depart_vehicle(&Id::new(0, "ghost"), 0);
    }
}
