use std::collections::VecDeque;

use crate::simulation::config;
use crate::simulation::events::{
    EventsManager, StopHoldEnteredEventBuilder, StopHoldReleasedEventBuilder,
};
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::network::flow_cap::FlowCap;
use crate::simulation::network::stop_queue::StopHoldQueue;
use crate::simulation::network::storage_cap::StorageCap;
use crate::simulation::vehicles::SimVehicle;

/// Outcome of checking a vehicle against its next scheduled stop on this link.
enum StopInterception {
    /// No stop on this link, or the stop yields no delay.
    NotIntercepted,
    /// Dwelling at a blocking stop, the vehicle keeps its place in the main queue.
    Blocking,
    /// Dwelling at a non-blocking stop, the vehicle moves to the hold queue.
    Hold,
}

/// Runtime state of one link: the primary vehicle queue, the outgoing buffer
/// filled under flow-capacity restrictions, and the stop hold queue for
/// vehicles dwelling at a non-blocking stop.
#[derive(Debug)]
pub struct SimLink {
    pub id: Id<Link>,
    q: VecDeque<SimVehicle>,
    buffer: VecDeque<SimVehicle>,
    stop_q: StopHoldQueue,
    flow_cap: FlowCap,
    storage_cap: StorageCap,
}

impl SimLink {
    pub fn from_link(link: &Link, effective_cell_size: f32, config: &config::Simulation) -> Self {
        SimLink {
            id: link.id.clone(),
            q: VecDeque::new(),
            buffer: VecDeque::new(),
            stop_q: StopHoldQueue::new(),
            flow_cap: FlowCap::new(link.capacity, config.sample_size),
            storage_cap: StorageCap::build(
                link.length,
                link.permlanes,
                link.capacity,
                config.sample_size,
                effective_cell_size,
            ),
        }
    }

    /// Entry point for a vehicle arriving on the link. The caller has already
    /// assigned the vehicle's earliest exit time. A freshly arriving vehicle is
    /// checked against its stop schedule with the same rule as a vehicle
    /// reaching the head of the queue.
    pub fn push_veh(&mut self, mut vehicle: SimVehicle, now: u32, events: &mut EventsManager) {
        self.storage_cap.consume(vehicle.pce);
        match self.check_stop(&mut vehicle, now) {
            StopInterception::Hold => self.push_to_hold(vehicle, now, events),
            _ => self.q.push_back(vehicle),
        }
    }

    /// Advances the link by one time step: regenerate flow capacity, merge
    /// ready stop-holders back in, then release queue heads into the buffer.
    pub fn do_sim_step(&mut self, now: u32, events: &mut EventsManager) {
        self.flow_cap.regenerate(now);
        self.drain_stop_queue(now, events);
        self.move_queue_to_buffer(now, events);
    }

    /// Reinserts every stop-holder whose exit time has passed at the front of
    /// the primary queue. The holder with the smallest exit time ends up
    /// nearest the front, so it rejoins traffic no later than vehicles that
    /// queued behind it.
    fn drain_stop_queue(&mut self, now: u32, events: &mut EventsManager) {
        let ready = self.stop_q.pop_ready(now);
        for vehicle in ready.into_iter().rev() {
            events.publish_event(
                &StopHoldReleasedEventBuilder::default()
                    .vehicle(vehicle.id.clone())
                    .link(self.id.clone())
                    .time(now)
                    .build()
                    .unwrap(),
            );
            self.q.push_front(vehicle);
        }
    }

    fn move_queue_to_buffer(&mut self, now: u32, events: &mut EventsManager) {
        loop {
            let Some(front) = self.q.front() else {
                break;
            };
            if front.earliest_link_exit_time > now {
                break;
            }

            let mut vehicle = self.q.pop_front().unwrap();
            match self.check_stop(&mut vehicle, now) {
                StopInterception::Hold => {
                    self.push_to_hold(vehicle, now, events);
                    continue;
                }
                StopInterception::Blocking => {
                    // dwells at the head of the queue, exit time has been advanced
                    self.q.push_front(vehicle);
                    continue;
                }
                StopInterception::NotIntercepted => {
                    if self.has_flow_capacity_left() {
                        self.buffer.push_back(vehicle);
                    } else {
                        self.q.push_front(vehicle);
                        break;
                    }
                }
            }
        }
    }

    fn push_to_hold(&mut self, vehicle: SimVehicle, now: u32, events: &mut EventsManager) {
        events.publish_event(
            &StopHoldEnteredEventBuilder::default()
                .vehicle(vehicle.id.clone())
                .link(self.id.clone())
                .time(now)
                .exit_time(vehicle.earliest_link_exit_time)
                .build()
                .unwrap(),
        );
        self.stop_q.push(vehicle);
    }

    /// Checks the vehicle's next scheduled stop. A stop on another link is a
    /// no-op. A stop on this link is served, and a strictly positive dwell
    /// delay advances the vehicle's earliest exit time.
    fn check_stop(&mut self, vehicle: &mut SimVehicle, now: u32) -> StopInterception {
        let Some(stops) = vehicle.stops.as_mut() else {
            return StopInterception::NotIntercepted;
        };
        let Some(stop) = stops.next_stop() else {
            return StopInterception::NotIntercepted;
        };
        if stop.link != self.id {
            return StopInterception::NotIntercepted;
        }

        let is_blocking = stop.is_blocking;
        let delay = stops.handle_stop(now);
        if delay == 0 {
            return StopInterception::NotIntercepted;
        }
        vehicle.earliest_link_exit_time = now + delay;
        if is_blocking {
            StopInterception::Blocking
        } else {
            StopInterception::Hold
        }
    }

    fn has_flow_capacity_left(&self) -> bool {
        let buffer_cap = self.buffer.iter().map(|v| v.pce).sum::<f32>();
        self.flow_cap.remaining() - buffer_cap > 0.0
    }

    /// Removes the next vehicle allowed to leave the link, consuming flow
    /// capacity and releasing its storage.
    pub fn pop_veh(&mut self) -> Option<SimVehicle> {
        if let Some(vehicle) = self.buffer.pop_front() {
            self.flow_cap.consume(vehicle.pce);
            self.storage_cap.release(vehicle.pce);
            return Some(vehicle);
        }
        None
    }

    pub fn is_available(&self) -> bool {
        self.storage_cap.is_available()
    }

    pub fn veh_count(&self) -> usize {
        self.q.len() + self.buffer.len() + self.stop_q.len()
    }

    pub fn stop_q_len(&self) -> usize {
        self.stop_q.len()
    }

    /// Drops all runtime state at an iteration boundary. Static capacities are
    /// kept, occupied storage is handed back.
    pub fn clear_runtime_state(&mut self) {
        self.q.clear();
        self.buffer.clear();
        self.stop_q.clear();
        let used = self.storage_cap.used();
        self.storage_cap.release(used);
    }
}
