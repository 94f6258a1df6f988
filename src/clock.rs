//! Wall-clock source for presence timestamps.

/// Milliseconds since the Unix epoch.
pub trait Clock {
	fn now_ms(&self) -> u64;
}

/// The platform clock: `Date.now()` in the browser, `SystemTime` elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	#[cfg(target_arch = "wasm32")]
	fn now_ms(&self) -> u64 {
		js_sys::Date::now() as u64
	}

	#[cfg(not(target_arch = "wasm32"))]
	fn now_ms(&self) -> u64 {
		use std::time::{SystemTime, UNIX_EPOCH};

		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or(0)
	}
}

impl<C: Clock + ?Sized> Clock for &C {
	fn now_ms(&self) -> u64 {
		(**self).now_ms()
	}
}
