pub mod route_sampler;

use std::cell::RefCell;
use std::rc::Rc;

use nohash_hasher::IntMap;
use tracing::debug;

use crate::simulation::config;
use crate::simulation::events::{EventsManager, LaneCapacityChangedEventBuilder};
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network};
use crate::simulation::parking::route_sampler::{RouteSampler, RoutingError};
use crate::simulation::vehicles::SimVehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneChange {
    /// One lane is taken out of service by parked vehicles.
    Reduce,
    /// The link is empty again, the lane is handed back.
    Restore,
}

/// Capability to mutate a link's effective lane capacity. Injected, so the
/// controller stays testable without live network state. Calls are
/// fire-and-forget from the controller's point of view.
pub trait LaneCapacityControl {
    fn decrease(&mut self, link: &Id<Link>, now: u32);
    fn increase(&mut self, link: &Id<Link>, now: u32);
}

/// Publishes lane capacity changes as events, leaving it to subscribers (the
/// network state cleanup of the outer simulation) to apply them.
pub struct EventPublishingLaneControl {
    events: Rc<RefCell<EventsManager>>,
}

impl EventPublishingLaneControl {
    pub fn new(events: Rc<RefCell<EventsManager>>) -> Self {
        EventPublishingLaneControl { events }
    }

    fn publish(&mut self, link: &Id<Link>, now: u32, change: LaneChange) {
        self.events.borrow_mut().publish_event(
            &LaneCapacityChangedEventBuilder::default()
                .link(link.clone())
                .time(now)
                .change(change)
                .build()
                .unwrap(),
        );
    }
}

impl LaneCapacityControl for EventPublishingLaneControl {
    fn decrease(&mut self, link: &Id<Link>, now: u32) {
        self.publish(link, now, LaneChange::Reduce);
    }

    fn increase(&mut self, link: &Id<Link>, now: u32) {
        self.publish(link, now, LaneChange::Restore);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingLocation {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
}

/// Outcome of one parking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParkingDecision {
    /// Admitted on the current link.
    Park(ParkingLocation),
    /// Not yet parked, keep cruising towards the sampled next link.
    Cruise(Id<Link>),
}

/// On-road parking controller. Owns per-link supply (computed once from link
/// geometry) and occupancy, decides admission and release, and reduces a
/// link's effective lane capacity while it holds parked vehicles.
pub struct OnRoadParking {
    supply: IntMap<Id<Link>, u32>,
    occupancy: IntMap<Id<Link>, u32>,
    history: IntMap<Id<SimVehicle>, Vec<Id<Link>>>,
    sampler: RouteSampler,
    lanes: Box<dyn LaneCapacityControl>,
}

impl OnRoadParking {
    pub fn new(
        network: &Network,
        lanes: Box<dyn LaneCapacityControl>,
        config: &config::Parking,
    ) -> Self {
        let vehicle_length = config.vehicle_length as f64;
        let mut supply = IntMap::default();
        for link in &network.links {
            let slots = if link.is_transit_stop {
                0
            } else if link.permlanes > 1.0 {
                (link.length / vehicle_length).floor() as u32
            } else {
                (link.length * 0.5 / vehicle_length).floor() as u32
            };
            supply.insert(link.id.clone(), slots);
        }

        OnRoadParking {
            supply,
            occupancy: IntMap::default(),
            history: IntMap::default(),
            sampler: RouteSampler::new(config.seed, config.weights),
            lanes,
        }
    }

    pub fn supply(&self, link: &Id<Link>) -> u32 {
        self.supply.get(link).copied().unwrap_or_default()
    }

    pub fn occupancy(&self, link: &Id<Link>) -> u32 {
        self.occupancy.get(link).copied().unwrap_or_default()
    }

    /// Decides one parking attempt for a searching vehicle: admission on its
    /// current link, or a sampled next hop to cruise to. The chosen next hop is
    /// appended to the vehicle's visited history, so the history reflects where
    /// the vehicle is heading.
    pub fn parking(
        &mut self,
        vehicle: &SimVehicle,
        network: &Network,
        now: u32,
    ) -> Result<ParkingDecision, RoutingError> {
        let current = vehicle
            .curr_link()
            .expect("parking attempt for a vehicle that is not on a link")
            .clone();

        if self.try_admit(&current, now) {
            return Ok(ParkingDecision::Park(ParkingLocation {
                vehicle: vehicle.id.clone(),
                link: current,
            }));
        }

        let candidates = network.out_links(&current);
        let visited = self.history.entry(vehicle.id.clone()).or_default();
        let next = self
            .sampler
            .sample(&current, candidates, &self.supply, visited)?;
        visited.push(next.clone());
        debug!(
            "vehicle {} found no parking on {current}, cruising to {next}",
            vehicle.id
        );
        Ok(ParkingDecision::Cruise(next))
    }

    /// Admission succeeds while occupancy is below supply. The first admission
    /// a link ever sees takes one lane out of service.
    pub fn try_admit(&mut self, link: &Id<Link>, now: u32) -> bool {
        let supply = self.supply(link);
        if supply == 0 {
            return false;
        }
        match self.occupancy.get_mut(link) {
            Some(occupancy) => {
                if *occupancy < supply {
                    *occupancy += 1;
                    true
                } else {
                    false
                }
            }
            None => {
                self.occupancy.insert(link.clone(), 1);
                self.lanes.decrease(link, now);
                true
            }
        }
    }

    /// Releases the vehicle's parking admission. Releasing a link that was
    /// never admitted to, or whose occupancy is already zero, means the
    /// counters are corrupted and aborts the run. Restores the lane when the
    /// link empties and clears the vehicle's visited history.
    pub fn release(&mut self, vehicle: &Id<SimVehicle>, link: &Id<Link>, now: u32) {
        let occupancy = self
            .occupancy
            .get_mut(link)
            .unwrap_or_else(|| panic!("The departing vehicle {vehicle} has no record on link {link}"));
        assert!(
            *occupancy > 0,
            "Released parking on link {link} with zero occupancy"
        );
        *occupancy -= 1;
        if *occupancy == 0 {
            self.lanes.increase(link, now);
        }
        if let Some(visited) = self.history.get_mut(vehicle) {
            visited.clear();
        }
    }

    /// Iteration boundary: occupancy starts over, supply stays. Lane
    /// reductions issued earlier are not reverted here; network state cleanup
    /// at iteration start is the collaborator responsible for that.
    pub fn on_iteration_start(&mut self) {
        self.occupancy.clear();
    }
}
