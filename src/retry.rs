//! Retry budget decisions for failed events.

/// Outcome of evaluating a retryable failure against the retry budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Send the event back to its source queue carrying the new retry count.
	Requeue {
		/// Retry count to publish; always the observed count plus one.
		retries: u32,
	},
	/// Budget spent; surface the failure.
	GiveUp,
}

/// Decides whether a failure with `current_retries` already recorded may be requeued.
///
/// The next attempt number is `current_retries + 1`; it is requeued while it does not exceed
/// `max_retries`.
pub fn decide(current_retries: u32, max_retries: u32) -> RetryDecision {
	match current_retries.checked_add(1) {
		Some(retries) if retries <= max_retries => RetryDecision::Requeue { retries },
		_ => RetryDecision::GiveUp,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn requeues_until_budget_is_spent() {
		assert_eq!(decide(0, 3), RetryDecision::Requeue { retries: 1 });
		assert_eq!(decide(2, 3), RetryDecision::Requeue { retries: 3 });
		assert_eq!(decide(3, 3), RetryDecision::GiveUp);
		assert_eq!(decide(7, 3), RetryDecision::GiveUp);
	}

	#[test]
	fn zero_budget_never_requeues() {
		assert_eq!(decide(0, 0), RetryDecision::GiveUp);
	}

	#[test]
	fn counter_increments_by_exactly_one_per_requeue() {
		let mut observed = 0;
		let mut published = Vec::new();

		while let RetryDecision::Requeue { retries } = decide(observed, 5) {
			published.push(retries);
			observed = retries;
		}

		assert_eq!(published, [1, 2, 3, 4, 5]);
	}

	#[test]
	fn overflowing_counter_gives_up() {
		assert_eq!(decide(u32::MAX, u32::MAX), RetryDecision::GiveUp);
	}
}
