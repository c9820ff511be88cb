quantity!(KilowattHours, via: f64, suffix: " kWh", precision: 3);

impl KilowattHours {
    pub const ONE_WATT_HOUR: Self = Self(0.001);
}
