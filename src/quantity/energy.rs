use std::ops::Div;

use chrono::TimeDelta;

use crate::quantity::power::Kilowatts;

quantity!(KilowattHours, "kWh");

impl Div<TimeDelta> for KilowattHours {
    type Output = Kilowatts;

    fn div(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Kilowatts(self.0 / hours)
    }
}
