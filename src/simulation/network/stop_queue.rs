use std::cmp::Ordering;

use keyed_priority_queue::KeyedPriorityQueue;
use nohash_hasher::IntMap;

use crate::simulation::id::Id;
use crate::simulation::vehicles::SimVehicle;

/// Priority of a holding vehicle. Smaller earliest exit times rank higher; ties
/// are broken by vehicle id so that draining order is reproducible.
#[derive(Debug, PartialEq, Eq)]
struct HoldPriority {
    exit_time: u32,
    vehicle: u64,
}

impl Ord for HoldPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .exit_time
            .cmp(&self.exit_time)
            .then_with(|| other.vehicle.cmp(&self.vehicle))
    }
}

impl PartialOrd for HoldPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Holding area for vehicles dwelling at a stop without blocking the link's
/// main queue. Always yields the vehicle with the smallest earliest exit time
/// first. A vehicle can be held at most once; inserting it twice means the
/// queues are corrupted and aborts the run.
#[derive(Debug, Default)]
pub struct StopHoldQueue {
    q: KeyedPriorityQueue<Id<SimVehicle>, HoldPriority>,
    cache: IntMap<Id<SimVehicle>, SimVehicle>,
}

impl StopHoldQueue {
    pub fn new() -> Self {
        StopHoldQueue {
            q: KeyedPriorityQueue::new(),
            cache: IntMap::default(),
        }
    }

    pub fn push(&mut self, vehicle: SimVehicle) {
        let id = vehicle.id.clone();
        let priority = HoldPriority {
            exit_time: vehicle.earliest_link_exit_time,
            vehicle: id.internal(),
        };
        if self.cache.insert(id.clone(), vehicle).is_some() {
            panic!("Vehicle {id} is already dwelling in the stop hold queue");
        }
        self.q.push(id, priority);
    }

    /// Removes all vehicles whose earliest exit time has passed, in increasing
    /// exit-time order. Calling this again at the same time is a no-op.
    pub fn pop_ready(&mut self, now: u32) -> Vec<SimVehicle> {
        let mut result = Vec::new();

        while let Some((_, priority)) = self.q.peek() {
            if priority.exit_time > now {
                break;
            }
            let (id, _) = self.q.pop().unwrap();
            let vehicle = self.cache.remove(&id).unwrap();
            result.push(vehicle);
        }

        result
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn clear(&mut self) {
        self.q = KeyedPriorityQueue::new();
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held_vehicle(internal: u64, exit_time: u32) -> SimVehicle {
        let mut veh = SimVehicle::new(Id::new(internal, &format!("veh-{internal}")), 10.0, 1.0);
        veh.earliest_link_exit_time = exit_time;
        veh
    }

    #[test]
    fn pops_in_exit_time_order() {
        let mut queue = StopHoldQueue::new();
        queue.push(held_vehicle(1, 12));
        queue.push(held_vehicle(2, 5));
        queue.push(held_vehicle(3, 9));

        let ready = queue.pop_ready(20);
        let times: Vec<u32> = ready.iter().map(|v| v.earliest_link_exit_time).collect();
        assert_eq!(vec![5, 9, 12], times);
        assert!(queue.is_empty());
    }

    #[test]
    fn only_ready_vehicles_are_drained() {
        let mut queue = StopHoldQueue::new();
        queue.push(held_vehicle(1, 12));
        queue.push(held_vehicle(2, 5));

        let ready = queue.pop_ready(5);
        assert_eq!(1, ready.len());
        assert_eq!("veh-2", ready[0].id.external());
        assert_eq!(1, queue.len());

        // draining again at the same time is a no-op
        assert!(queue.pop_ready(5).is_empty());
    }

    #[test]
    fn equal_exit_times_drain_by_vehicle_id() {
        let mut queue = StopHoldQueue::new();
        queue.push(held_vehicle(7, 10));
        queue.push(held_vehicle(3, 10));

        let ready = queue.pop_ready(10);
        let ids: Vec<&str> = ready.iter().map(|v| v.id.external()).collect();
        assert_eq!(vec!["veh-3", "veh-7"], ids);
    }

    #[test]
    #[should_panic(expected = "already dwelling")]
    fn double_insertion_is_fatal() {
        let mut queue = StopHoldQueue::new();
        queue.push(held_vehicle(1, 10));
        queue.push(held_vehicle(1, 15));
    }
}
