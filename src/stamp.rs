use chrono::{DateTime, TimeZone};

use crate::error::Result;
use crate::hijri::{to_hijri_display, HijriConverter};
use crate::models::{GregorianStamp, HijriStamp, LastUpdate, UpdateStamp};

/// "Last updated" marker for `now`, in Gregorian, Hijri and Unix form.
pub fn build_stamp<Tz>(now: &DateTime<Tz>, converter: &dyn HijriConverter) -> Result<UpdateStamp>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M").to_string();
    let full = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let hijri = to_hijri_display(converter, now.date_naive(), true, true)?;

    Ok(UpdateStamp {
        last_update: LastUpdate {
            gregorian: GregorianStamp {
                display: format!("{date} - {time}"),
                date,
                time,
                full,
            },
            hijri: HijriStamp {
                date: hijri.clone(),
                display: hijri,
            },
            timestamp: now.timestamp(),
        },
    })
}
