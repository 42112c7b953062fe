use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use parking_qsim::simulation::config::Config;
use parking_qsim::simulation::controller::Simulation;
use parking_qsim::simulation::events::EventsManager;
use parking_qsim::simulation::id::Id;
use parking_qsim::simulation::network::{Link, Network};
use parking_qsim::simulation::parking::LaneChange;
use parking_qsim::simulation::vehicles::{SimVehicle, VehicleState};
use parking_qsim::test_utils::RecordingLaneControl;

/// n1 -a-> n2 -b-> n3 -c-> n1. Link a is too short for any parking supply,
/// b and c provide supply.
fn search_network() -> (Network, Id<Link>, Id<Link>, Id<Link>) {
    let mut network = Network::new();
    let n1 = network.create_node("n1", 0., 0.);
    let n2 = network.create_node("n2", 80., 0.);
    let n3 = network.create_node("n3", 160., 0.);
    let a = network.create_link("a", &n1, &n2, 4., 3600., 10., 1., false);
    let b = network.create_link("b", &n2, &n3, 80., 3600., 10., 2., false);
    let c = network.create_link("c", &n3, &n1, 80., 3600., 10., 2., false);
    (network, a, b, c)
}

fn searching_vehicle(internal: u64) -> SimVehicle {
    let mut vehicle = SimVehicle::new(Id::new(internal, &format!("drt-{internal}")), 10.0, 1.0);
    vehicle.begin_search();
    vehicle
}

#[test]
fn exhausted_link_hands_the_vehicle_to_the_next_one() {
    let (network, a, b, _) = search_network();
    let network = Arc::new(network);
    let events = Rc::new(RefCell::new(EventsManager::new()));
    let recorder = RecordingLaneControl::default();
    let mut sim = Simulation::new(
        Arc::new(Config::default()),
        network,
        Box::new(recorder.clone()),
        events,
    );

    assert_eq!(0, sim.parking().supply(&a));
    assert_eq!(10, sim.parking().supply(&b));

    // the only way out of link a is link b, so the sampler must offer b
    sim.spawn_veh(searching_vehicle(1), &a, 0);
    for now in 0..20 {
        sim.step(now).unwrap();
    }

    assert_eq!(0, sim.parking().occupancy(&a));
    assert_eq!(1, sim.parking().occupancy(&b));
    let parked: Vec<&SimVehicle> = sim.parked_vehicles().collect();
    assert_eq!(1, parked.len());
    assert_eq!(VehicleState::Parked, parked[0].state());
    assert_eq!(Some(&b), parked[0].curr_link());

    // exactly one lane reduction, for link b only
    assert_eq!(vec![(b.clone(), 9, LaneChange::Reduce)], recorder.calls());
}

#[test]
fn occupancy_stays_within_supply_when_the_fleet_fills_a_link() {
    let mut network = Network::new();
    let n1 = network.create_node("n1", 0., 0.);
    let n2 = network.create_node("n2", 80., 0.);
    let n3 = network.create_node("n3", 160., 0.);
    let a = network.create_link("a", &n1, &n2, 4., 3600., 10., 1., false);
    // 16m and two lanes: room for exactly two parked vehicles
    let b = network.create_link("b", &n2, &n3, 16., 3600., 10., 2., false);
    let c = network.create_link("c", &n3, &n1, 80., 3600., 10., 2., false);
    let network = Arc::new(network);

    let events = Rc::new(RefCell::new(EventsManager::new()));
    let recorder = RecordingLaneControl::default();
    let mut sim = Simulation::new(
        Arc::new(Config::default()),
        network,
        Box::new(recorder.clone()),
        events,
    );
    assert_eq!(2, sim.parking().supply(&b));

    for i in 0..4 {
        sim.spawn_veh(searching_vehicle(i), &a, 0);
    }
    for now in 0..200 {
        sim.step(now).unwrap();
    }

    assert!(sim.parking().occupancy(&b) <= sim.parking().supply(&b));
    assert_eq!(4, sim.parked_vehicles().count());
    assert_eq!(
        4,
        sim.parking().occupancy(&a)
            + sim.parking().occupancy(&b)
            + sim.parking().occupancy(&c)
    );
}

#[test]
fn iteration_start_resets_runtime_state_but_not_supply() {
    let (network, a, b, _) = search_network();
    let network = Arc::new(network);
    let events = Rc::new(RefCell::new(EventsManager::new()));
    let mut sim = Simulation::new(
        Arc::new(Config::default()),
        network,
        Box::new(RecordingLaneControl::default()),
        events,
    );

    sim.spawn_veh(searching_vehicle(1), &a, 0);
    for now in 0..20 {
        sim.step(now).unwrap();
    }
    assert_eq!(1, sim.parking().occupancy(&b));

    sim.on_iteration_start();
    assert_eq!(0, sim.parking().occupancy(&b));
    assert_eq!(10, sim.parking().supply(&b));
    assert_eq!(0, sim.parked_vehicles().count());
}

#[test]
fn routing_failure_on_a_dead_end_is_reported() {
    let mut network = Network::new();
    let n1 = network.create_node("n1", 0., 0.);
    let n2 = network.create_node("n2", 80., 0.);
    // no supply and no way out
    let a = network.create_link("a", &n1, &n2, 4., 3600., 10., 1., false);
    let network = Arc::new(network);

    let mut sim = Simulation::new(
        Arc::new(Config::default()),
        network,
        Box::new(RecordingLaneControl::default()),
        Rc::new(RefCell::new(EventsManager::new())),
    );
    assert_eq!(0, sim.parking().supply(&a));

    sim.spawn_veh(searching_vehicle(1), &a, 0);
    let mut result = Ok(());
    for now in 0..10 {
        result = sim.step(now);
        if result.is_err() {
            break;
        }
    }
    assert!(result.is_err());
}
