use crate::transport::ConnectOptions;
use std::convert::TryFrom;
use tokio::time::Duration;

/// RingOptions tunes how a node talks to its peers. Every field falls back to a default.
#[derive(Clone, Default, Debug)]
pub struct RingOptions {
    pub connect_max_attempts: Option<u32>,
    pub connect_retry_interval: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub post_send_pause: Option<Duration>,
}

#[derive(Debug)]
pub(super) struct RingOptionsValidated {
    pub connect_max_attempts: u32,
    pub connect_retry_interval: Duration,
    pub connect_timeout: Duration,
    pub post_send_pause: Duration,
}

impl RingOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.connect_max_attempts == 0 {
            return Err("Connect attempts must be at least 1");
        }
        if self.connect_retry_interval.is_zero() {
            return Err("Connect retry interval must be greater than zero");
        }
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be greater than zero");
        }
        if self.post_send_pause >= self.connect_retry_interval {
            return Err("Post-send pause must be less than the connect retry interval");
        }

        Ok(())
    }

    pub(super) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_attempts: self.connect_max_attempts,
            retry_interval: self.connect_retry_interval,
            connect_timeout: self.connect_timeout,
            post_send_pause: self.post_send_pause,
        }
    }
}

impl TryFrom<RingOptions> for RingOptionsValidated {
    type Error = &'static str;

    fn try_from(options: RingOptions) -> Result<Self, Self::Error> {
        let values = RingOptionsValidated {
            connect_max_attempts: options.connect_max_attempts.unwrap_or(60),
            connect_retry_interval: options.connect_retry_interval.unwrap_or(Duration::from_secs(1)),
            connect_timeout: options.connect_timeout.unwrap_or(Duration::from_secs(1)),
            post_send_pause: options.post_send_pause.unwrap_or(Duration::from_millis(25)),
        };

        values.validate()?;
        Ok(values)
    }
}
