/// Outflow budget of a link. Every time step regenerates capacity up to one
/// step's worth, vehicles leaving the link consume it. A large gap between
/// updates never grants more than a single step's budget, so a link that sat
/// idle cannot flush its whole queue at once.
#[derive(Debug, Clone)]
pub struct FlowCap {
    per_step: f32,
    remaining: f32,
    last_update: u32,
}

impl FlowCap {
    pub(super) fn new(capacity_h: f32, sample_size: f32) -> FlowCap {
        let per_step = capacity_h * sample_size / 3600.;
        FlowCap {
            per_step,
            remaining: per_step,
            last_update: 0,
        }
    }

    pub(super) fn regenerate(&mut self, now: u32) {
        if now <= self.last_update {
            return;
        }
        let gained = (now - self.last_update) as f32 * self.per_step;
        self.remaining = (self.remaining + gained).min(self.per_step);
        self.last_update = now;
    }

    pub(super) fn remaining(&self) -> f32 {
        self.remaining
    }

    pub(super) fn consume(&mut self, pce: f32) {
        self.remaining -= pce;
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::FlowCap;

    #[test]
    fn per_step_budget_scales_with_sample_size() {
        let cap = FlowCap::new(7200., 0.5);
        assert_approx_eq!(1.0, cap.per_step, 0.0001);
    }

    #[test]
    fn consuming_can_overdraw_the_budget() {
        let mut cap = FlowCap::new(3600., 1.);
        cap.consume(2.5);
        assert_approx_eq!(-1.5, cap.remaining(), 0.0001);
    }

    #[test]
    fn regeneration_is_capped_at_one_step() {
        let mut cap = FlowCap::new(36000., 1.);
        cap.regenerate(20);
        assert_eq!(10.0, cap.remaining());
        assert_eq!(20, cap.last_update);
    }

    #[test]
    fn overdrawn_budget_recovers_step_by_step() {
        // 900 veh/h regenerates 0.25 per second
        let mut cap = FlowCap::new(900., 1.);
        cap.consume(1.0);

        cap.regenerate(1);
        assert_approx_eq!(-0.5, cap.remaining(), 0.0001);
        cap.regenerate(3);
        assert_approx_eq!(0.0, cap.remaining(), 0.0001);
        cap.regenerate(5);
        assert_approx_eq!(0.25, cap.remaining(), 0.0001);
    }

    #[test]
    fn stale_updates_are_ignored() {
        let mut cap = FlowCap::new(3600., 1.);
        cap.consume(1.0);
        cap.regenerate(5);
        cap.regenerate(5);
        cap.regenerate(3);
        assert_eq!(1.0, cap.remaining());
    }
}
