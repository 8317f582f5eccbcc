use std::future::Future;
use std::time::Duration;

use super::RegistryError;

/// Bounded exponential backoff for transient registry failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	attempts: u32,
	initial_backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(3, Duration::from_millis(250))
	}
}

impl RetryPolicy {
	/// `attempts` includes the first try and is at least 1.
	pub fn new(attempts: u32, initial_backoff: Duration) -> Self {
		Self { attempts: attempts.max(1), initial_backoff }
	}

	/// Never retries.
	pub fn none() -> Self {
		Self::new(1, Duration::ZERO)
	}

	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	pub fn initial_backoff(&self) -> Duration {
		self.initial_backoff
	}

	/// Runs `operation` until it succeeds, fails with a non-transient error or runs out of attempts.
	///
	/// The backoff doubles after every failed attempt.
	pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RegistryError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, RegistryError>>,
	{
		let mut backoff = self.initial_backoff;
		let mut attempt = 1;
		loop {
			match operation().await {
				Err(e) if e.is_transient() && attempt < self.attempts => {
					log::warn!("Registry request failed (attempt {}/{}): {}, retrying in {:?}", attempt, self.attempts, e, backoff);
					tokio::time::sleep(backoff).await;
					backoff = backoff.saturating_mul(2);
					attempt += 1;
				},
				res => return res,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn transient_errors_are_retried() {
		let calls = AtomicU32::new(0);
		let res = RetryPolicy::new(3, Duration::ZERO).run(|| async {
			if calls.fetch_add(1, Ordering::SeqCst) < 2 {
				Err(RegistryError::Status(503))
			} else {
				Ok(7)
			}
		}).await;
		assert_eq!(res.unwrap(), 7);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn retries_are_bounded() {
		let calls = AtomicU32::new(0);
		let res: Result<(), _> = RetryPolicy::new(2, Duration::ZERO).run(|| async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(RegistryError::Status(502))
		}).await;
		assert!(matches!(res, Err(RegistryError::Status(502))));
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn permanent_errors_are_not_retried() {
		let calls = AtomicU32::new(0);
		let res: Result<(), _> = RetryPolicy::default().run(|| async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(RegistryError::Status(404))
		}).await;
		assert!(res.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
