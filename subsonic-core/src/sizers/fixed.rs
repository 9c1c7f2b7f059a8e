//! Fixed lot sizer.

use super::{LotSizer, SizingContext};

/// Always trade the same lot. A non-positive lot is passed through so the
/// qualifier can reject it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLot {
    lot: f64,
}

impl FixedLot {
    pub fn new(lot: f64) -> Self {
        Self { lot }
    }
}

impl LotSizer for FixedLot {
    fn lot_size(&self, _ctx: &SizingContext) -> f64 {
        self.lot
    }

    fn name(&self) -> &str {
        "fixed_lot"
    }
}
