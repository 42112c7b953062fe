/// Storage capacity of a link. The maximum is derived from link geometry and
/// is at least one flow-capacity time step, so that a link can always pass on
/// what it releases per step. Occupied capacity is tracked in pce units,
/// consumed when a vehicle enters the link and released when it leaves,
/// including vehicles dwelling in the stop hold queue.
#[derive(Debug, Clone)]
pub struct StorageCap {
    max: f32,
    used: f32,
}

impl StorageCap {
    pub fn build(
        length: f64,
        perm_lanes: f32,
        capacity_h: f32,
        sample_size: f32,
        effective_cell_size: f32,
    ) -> Self {
        let flow_cap_s = capacity_h * sample_size / 3600.;
        let cap = length * perm_lanes as f64 * sample_size as f64 / effective_cell_size as f64;
        let max = flow_cap_s.max(cap as f32);

        Self { max, used: 0.0 }
    }

    pub fn used(&self) -> f32 {
        self.used
    }

    pub fn consume(&mut self, value: f32) {
        self.used += value;
    }

    pub fn release(&mut self, value: f32) {
        self.used -= value;
    }

    pub fn is_available(&self) -> bool {
        self.max - self.used > 0.0
    }
}
