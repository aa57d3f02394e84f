use super::Divider;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Sweep {
    divider: Divider,
    enable: bool,
    negate: bool,
    shift: u8,
    target: usize,
    reload: bool,
    // pulse 1 subtracts one extra (ones' complement adder)
    negate_extra: usize,
    muting: bool,
}

impl Sweep {
    pub fn new(negate_extra: usize) -> Self {
        Self {
            divider: Divider::new(),
            enable: false,
            negate: false,
            shift: 0,
            target: 0,
            reload: false,
            negate_extra,
            muting: false,
        }
    }

    /// half-frame clock; may retune the channel timer
    pub fn tick(&mut self, timer: &mut Divider) {
        self.retarget(timer);

        if self.divider.count() == 0 && self.enable && self.shift > 0 && !self.muting {
            timer.set_period(self.target);
        }

        if self.divider.count() == 0 || self.reload {
            self.reload = false;
            self.divider.reset();
        } else {
            self.divider.tick();
        }
    }

    fn retarget(&mut self, timer: &Divider) {
        let period = timer.period();
        let delta = period >> self.shift;
        self.target = if self.negate {
            period.saturating_sub(delta + self.negate_extra)
        } else {
            period + delta
        };

        self.muting = period < 8 || self.target > 0x7ff;
    }

    pub fn load(&mut self, data: u8) {
        self.enable = data.get_bit(7);
        self.divider.set_period(data.get_bits(4..7) as usize);
        self.negate = data.get_bit(3);
        self.shift = data.get_bits(0..3);

        self.reload = true;
    }

    pub fn muting(&self) -> bool {
        self.muting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutes_below_period_8_and_above_7ff() {
        let mut sweep = Sweep::new(0);
        let mut timer = Divider::new();

        timer.set_period(4);
        sweep.tick(&mut timer);
        assert!(sweep.muting());

        timer.set_period(0x700);
        sweep.load(0b0000_0001); // shift 1, adding
        sweep.tick(&mut timer);
        assert!(sweep.muting()); // 0x700 + 0x380 > 0x7ff

        timer.set_period(0x100);
        sweep.tick(&mut timer);
        assert!(!sweep.muting());
    }

    #[test]
    fn negate_applies_the_per_channel_offset() {
        let mut one = Sweep::new(1);
        let mut two = Sweep::new(0);
        let mut timer = Divider::new();
        timer.set_period(0x100);

        one.load(0b1000_1100); // enabled, negate, shift 4, period 0
        two.load(0b1000_1100);

        one.tick(&mut timer);
        assert_eq!(timer.period(), 0x100 - 0x10 - 1);

        let mut timer = Divider::new();
        timer.set_period(0x100);
        two.tick(&mut timer);
        assert_eq!(timer.period(), 0x100 - 0x10);
    }
}
