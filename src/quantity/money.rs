quantity!(
    /// Currency-agnostic monetary amount, in whatever unit the spot prices are quoted.
    Money, via: f64, suffix: "", precision: 2
);

impl Money {
    /// Round to cents of the quoted unit.
    pub fn round_to_cents(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }
}
