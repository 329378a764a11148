pub mod jwt;
pub mod problem;

pub mod util {
    /// Serializes [`DateTime`](chrono::DateTime) as unix seconds, the form JWT
    /// registered claims use.
    pub mod date_time_as_unix_seconds {
        use chrono::{DateTime, TimeZone, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_i64(value.timestamp())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let seconds = i64::deserialize(deserializer)?;
            Utc.timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| de::Error::custom(format!("{} is out of range", seconds)))
        }
    }
}
