use rand::rngs::ThreadRng;
use rand::Rng;

/// Stock quantity given to a freshly seeded product. Placeholder data only.
pub trait StockPolicy {
    fn stock_for(&mut self, ordinal: usize) -> u32;
}

/// Uniform draw from `[0, max)`.
pub struct RandomStock {
    max: u32,
    rng: ThreadRng,
}

impl RandomStock {
    pub fn new(max: u32) -> Self {
        Self {
            max: max.max(1),
            rng: rand::thread_rng(),
        }
    }
}

impl StockPolicy for RandomStock {
    fn stock_for(&mut self, _ordinal: usize) -> u32 {
        self.rng.gen_range(0..self.max)
    }
}

pub struct FixedStock(pub u32);

impl StockPolicy for FixedStock {
    fn stock_for(&mut self, _ordinal: usize) -> u32 {
        self.0
    }
}
