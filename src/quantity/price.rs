use crate::quantity::{energy::KilowattHours, money::Money};

quantity!(
    /// Price of one kilowatt-hour.
    KilowattHourPrice, via: f64, suffix: " /kWh", precision: 3
);

implement_mul!(KilowattHourPrice, KilowattHours, Money);
