use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use itertools::Itertools;
use tracing::info;

use parking_qsim::simulation::config::{CommandLineArgs, Config};
use parking_qsim::simulation::controller::Simulation;
use parking_qsim::simulation::events::{EventsManager, LaneCapacityChangedEvent, ParkingAdmittedEvent};
use parking_qsim::simulation::id::Id;
use parking_qsim::simulation::logging;
use parking_qsim::simulation::network::Network;
use parking_qsim::simulation::parking::EventPublishingLaneControl;
use parking_qsim::simulation::vehicles::SimVehicle;

fn main() {
    let args = CommandLineArgs::parse();
    let config = Arc::new(Config::from(args));
    let _guards = logging::init_logging(&config);

    let network =
        Arc::new(Network::from_file(&config.network.path).expect("Failed to load network"));

    let events = Rc::new(RefCell::new(EventsManager::new()));
    events
        .borrow_mut()
        .on::<ParkingAdmittedEvent, _>(|e| info!("{}: vehicle {} parked on {}", e.time, e.vehicle, e.link));
    events.borrow_mut().on::<LaneCapacityChangedEvent, _>(|e| {
        info!("{}: lane capacity of {} changed: {:?}", e.time, e.link, e.change)
    });

    let lanes = Box::new(EventPublishingLaneControl::new(events.clone()));
    let mut sim = Simulation::new(config.clone(), network.clone(), lanes, events);

    let start = config.simulation.start_time;
    let first_link = &network.links.first().expect("network has no links").id;
    for i in 0..config.parking.fleet_size {
        let mut vehicle = SimVehicle::new(Id::new(i as u64, &format!("drt-{i}")), 10.0, 1.0);
        vehicle.begin_search();
        sim.spawn_veh(vehicle, first_link, start);
    }

    sim.run().expect("simulation failed");

    let per_link = sim
        .parked_vehicles()
        .map(|v| v.curr_link().unwrap().external().to_string())
        .counts();
    for (link, count) in per_link.iter().sorted() {
        info!("link {link}: {count} parked vehicles");
    }
}
