//! Batch orchestrator loop tests
//!
//! Each test drives one `BatchOrchestrator` directly against a scripted
//! generator and an in-memory or mocked store. Time is paused, so retry
//! delays, cooldowns and rate-limit waits complete instantly while still
//! being visible in call timestamps.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use common::{run_job, Outcome, ScriptedGenerator, TestFixtures, TestHelpers};
use orchestrator::traits::{BatchStore, MockBatchStore};
use orchestrator::{BatchOrchestrator, OrchestratorError};
use shared::{
    BatchEvent, BatchStatus, CircuitState, ErrorCategory, ErrorKind, ProviderId, ProviderProfile, SampleType,
};

#[tokio::test(start_paused = true)]
async fn test_completed_job_persists_every_sample() {
    // Arrange
    let store = TestHelpers::memory_store();
    let generator = Arc::new(ScriptedGenerator::always_ok());
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), store.clone());

    // Act
    let (job, events) = run_job(services, TestFixtures::job(25), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.samples_generated, 25);
    assert_eq!(job.samples_persisted, 25);
    assert_eq!(job.total_tokens, 2_500);
    assert!(job.completed_at.is_some());
    assert_eq!(store.samples_for(&job.id).await.len(), 25);
    assert_eq!(generator.call_count(), 25);

    let stored = store.get_by_job_id(&job.id).await.unwrap().expect("stored job");
    assert_eq!(stored.status, BatchStatus::Completed);
    assert_eq!(stored.samples_persisted, 25);

    TestHelpers::assert_single_terminal(&events);
    let progress: Vec<u32> = events.iter().map(|event| event.batch().samples_generated).collect();
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]), "samples_generated went backwards");
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_item_is_skipped_without_calls() {
    // Arrange: VAT always produces malformed output, Income Tax always works
    let mut config = TestFixtures::config();
    config.failure_threshold = 100;
    let generator = Arc::new(ScriptedGenerator::new(|request, _| {
        if request.work_item.key() == TestFixtures::VAT {
            Outcome::ContentError("missing field `case_citation`".to_string())
        } else {
            Outcome::Success(100)
        }
    }));
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, events) = run_job(services, TestFixtures::job(10), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(generator.calls_for_item(TestFixtures::VAT).len(), 3, "no calls once the circuit opened");
    assert!(job.skipped_items.contains(TestFixtures::VAT));
    assert_eq!(job.circuit_breakers[TestFixtures::VAT].state, CircuitState::Open);
    assert_eq!(job.circuit_breakers[TestFixtures::VAT].failure_count, 3);
    assert!(events
        .iter()
        .any(|event| matches!(event, BatchEvent::Skipped { work_item, .. } if work_item == TestFixtures::VAT)));
    assert!(job
        .errors
        .iter()
        .all(|error| error.kind == ErrorKind::ContentValidation && error.category.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_lets_one_probe_through_after_cooldown() {
    // Arrange: slow calls so the 300s cooldown elapses mid-job
    let mut config = TestFixtures::config();
    config.failure_threshold = 100;
    let cooldown = config.circuit.cooldown;
    let generator = Arc::new(
        ScriptedGenerator::new(|request, _| {
            if request.work_item.key() == TestFixtures::VAT {
                Outcome::ContentError("answer does not match requested topic".to_string())
            } else {
                Outcome::Success(100)
            }
        })
        .with_latency(Duration::from_secs(50)),
    );
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(10), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    let vat_calls = generator.calls_for_item(TestFixtures::VAT);
    assert!(vat_calls.len() >= 4, "expected a half-open probe, got {} calls", vat_calls.len());
    for pair in vat_calls[2..].windows(2) {
        assert!(
            pair[1].at.duration_since(pair[0].at) >= cooldown,
            "item called again before its cooldown elapsed"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_window_caps_calls_per_minute() {
    // Arrange
    let config = TestFixtures::config_with(
        vec![ProviderProfile::new(
            ProviderId::Groq,
            shared::RateLimits::new(5, 0),
            &[TestFixtures::MODEL_A],
        )],
        vec![ProviderId::Groq],
    );
    let generator = Arc::new(ScriptedGenerator::always_ok());
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());
    let start = Instant::now();

    // Act
    let (job, _) = run_job(services, TestFixtures::job(12), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    let calls = generator.calls();
    assert_eq!(calls.len(), 12);
    for i in 0..calls.len() - 5 {
        assert!(
            calls[i + 5].at.duration_since(calls[i].at) >= Duration::from_secs(60),
            "more than 5 calls inside one 60s window at call {i}"
        );
    }
    assert!(calls[11].at.duration_since(start) >= Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_threshold_switch_moves_to_untried_model() {
    // Arrange
    let generator = Arc::new(ScriptedGenerator::failing_model(TestFixtures::MODEL_A, TestFixtures::ODD_FAILURE));
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(4), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.model_switches.len(), 1);
    let switch = &job.model_switches[0];
    assert_eq!(switch.from_model, TestFixtures::MODEL_A);
    assert_eq!(switch.to_model, TestFixtures::MODEL_B);
    assert_eq!(switch.category, Some(ErrorCategory::General));
    assert!(switch.reason.contains("3 consecutive failures"));

    let failed = &job.failed_models_by_provider[&ProviderId::Groq];
    assert!(failed.contains(TestFixtures::MODEL_A));
    assert!(!failed.contains(&switch.to_model));

    let calls = generator.calls();
    let a_calls = calls.iter().filter(|call| call.model == TestFixtures::MODEL_A).count();
    assert_eq!(a_calls, 3);
    assert!(calls[3..].iter().all(|call| call.model == TestFixtures::MODEL_B));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_error_switches_immediately() {
    // Arrange
    let generator = Arc::new(ScriptedGenerator::failing_model(TestFixtures::MODEL_A, TestFixtures::RATE_LIMITED));
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, events) = run_job(services, TestFixtures::job(3), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    let calls = generator.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].model, TestFixtures::MODEL_A);
    assert_eq!(calls[1].model, TestFixtures::MODEL_B);
    assert_eq!(calls[0].item, calls[1].item, "switch retries the same work item");
    assert_eq!(calls[1].at, calls[0].at, "no retry delay after a switch");

    assert_eq!(job.model_switches.len(), 1);
    assert_eq!(job.model_switches[0].category, Some(ErrorCategory::RateLimit));
    assert_eq!(job.errors.len(), 1);
    assert_eq!(job.errors[0].category, Some(ErrorCategory::RateLimit));
    assert_eq!(job.errors[0].model.as_deref(), Some(TestFixtures::MODEL_A));

    let switch_event = events
        .iter()
        .find_map(|event| match event {
            BatchEvent::Switch { record, batch } => Some((record, batch)),
            _ => None,
        })
        .expect("switch event");
    assert_eq!(switch_event.0.to_model, TestFixtures::MODEL_B);
    assert_eq!(switch_event.1.model, TestFixtures::MODEL_B);
}

#[tokio::test(start_paused = true)]
async fn test_bad_request_retries_same_model_until_threshold() {
    // Arrange
    let generator = Arc::new(ScriptedGenerator::failing_model(TestFixtures::MODEL_A, TestFixtures::BAD_REQUEST));
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(3), TestHelpers::cycle()).await;

    // Assert: retried locally with the normal delay, no switch on the first failure
    assert_eq!(job.status, BatchStatus::Completed);
    let calls = generator.calls();
    assert!(calls[..3].iter().all(|call| call.model == TestFixtures::MODEL_A));
    assert!(calls[..3].iter().all(|call| call.item == TestFixtures::VAT));
    assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(2));
    assert_eq!(calls[2].at - calls[1].at, Duration::from_secs(2));
    assert!(calls[3..].iter().all(|call| call.model == TestFixtures::MODEL_B));

    let bad_requests: Vec<_> = job
        .errors
        .iter()
        .filter(|error| error.model.as_deref() == Some(TestFixtures::MODEL_A))
        .collect();
    assert_eq!(bad_requests.len(), 3);
    assert!(bad_requests.iter().all(|error| error.category == Some(ErrorCategory::BadRequest)));

    // Only the threshold moves it on, once
    assert_eq!(job.model_switches.len(), 1);
    assert!(job.model_switches[0].reason.starts_with("3 consecutive failures"));
    assert_eq!(job.model_switches[0].to_model, TestFixtures::MODEL_B);
}

#[tokio::test(start_paused = true)]
async fn test_generator_panic_counts_as_failed_call() {
    // Arrange
    let generator = Arc::new(ScriptedGenerator::new(|request, _| {
        if request.model == TestFixtures::MODEL_A {
            Outcome::Panic("provider client blew up")
        } else {
            Outcome::Success(100)
        }
    }));
    let store = TestHelpers::memory_store();
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), store.clone());

    // Act
    let (job, events) = run_job(services, TestFixtures::job(3), TestHelpers::cycle()).await;

    // Assert: the loop survived, switched away and finalised normally
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.samples_generated, 3);
    assert_eq!(job.model_switches.len(), 1);
    assert_eq!(job.model_switches[0].from_model, TestFixtures::MODEL_A);

    let panics: Vec<_> = job.errors.iter().filter(|error| error.message.contains("panicked")).collect();
    assert_eq!(panics.len(), 3);
    assert!(panics.iter().all(|error| error.kind == ErrorKind::Provider && !error.fatal));
    assert!(panics[0].message.contains("provider client blew up"));

    assert_eq!(store.samples_for(&job.id).await.len(), 3);
    TestHelpers::assert_single_terminal(&events);
}

#[tokio::test(start_paused = true)]
async fn test_provider_switch_after_models_exhausted() {
    // Arrange: every Groq call is rejected for credentials
    let generator = Arc::new(ScriptedGenerator::new(|request, _| {
        if request.provider == ProviderId::Groq {
            Outcome::ProviderError(TestFixtures::UNAUTHORIZED.to_string())
        } else {
            Outcome::Success(100)
        }
    }));
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(2), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.provider, ProviderId::Cerebras);
    assert_eq!(job.model, TestFixtures::CEREBRAS_MODEL);
    assert_eq!(job.model_switches.len(), 1);
    assert_eq!(job.provider_switches.len(), 1);
    assert_eq!(job.provider_switches[0].from_provider, ProviderId::Groq);
    assert_eq!(job.provider_switches[0].category, Some(ErrorCategory::Authentication));
    assert_eq!(generator.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_when_no_target_remains() {
    // Arrange
    let config = TestFixtures::config_with(
        vec![ProviderProfile::new(
            ProviderId::Groq,
            TestFixtures::unlimited(),
            &[TestFixtures::MODEL_A, TestFixtures::MODEL_B],
        )],
        vec![ProviderId::Groq],
    );
    let generator = Arc::new(ScriptedGenerator::new(|_, _| {
        Outcome::ProviderError(TestFixtures::UNAUTHORIZED.to_string())
    }));
    let store = TestHelpers::memory_store();
    let services = TestHelpers::services(config, generator.clone(), store.clone());

    // Act
    let (job, events) = run_job(services, TestFixtures::job(5), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Exhausted);
    assert_eq!(job.samples_generated, 0);
    assert_eq!(generator.call_count(), 2);
    let last = job.errors.last().expect("exhaustion error");
    assert_eq!(last.kind, ErrorKind::Exhaustion);
    assert!(last.fatal);
    assert!(job.completed_at.is_some());
    let stored = store.get_by_job_id(&job.id).await.unwrap().expect("stored job");
    assert_eq!(stored.status, BatchStatus::Exhausted);
    TestHelpers::assert_single_terminal(&events);
}

#[tokio::test(start_paused = true)]
async fn test_balanced_sample_types() {
    // Arrange
    let store = TestHelpers::memory_store();
    let generator = Arc::new(ScriptedGenerator::always_ok());
    let services = TestHelpers::services(TestFixtures::config(), generator, store.clone());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(8), TestHelpers::single_item_cycle()).await;

    // Assert
    let samples = store.samples_for(&job.id).await;
    assert_eq!(samples.len(), 8);
    for sample_type in SampleType::CYCLE {
        let count = samples.iter().filter(|s| s.sample_type == sample_type).count();
        assert_eq!(count, 2, "{sample_type} should appear twice");
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_lands_after_in_flight_call() {
    // Arrange
    let generator = Arc::new(ScriptedGenerator::always_ok().with_latency(Duration::from_secs(10)));
    let services = TestHelpers::services(TestFixtures::config(), generator.clone(), TestHelpers::memory_store());
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let orchestrator = BatchOrchestrator::new(TestFixtures::job(50), TestHelpers::cycle(), services, events_tx, stop_rx);

    // Act
    let handle = tokio::spawn(orchestrator.run());
    tokio::time::sleep(Duration::from_secs(5)).await;
    stop_tx.send_replace(true);
    let job = handle.await.unwrap();

    // Assert
    assert_eq!(job.status, BatchStatus::Stopped);
    assert_eq!(generator.call_count(), 1);
    assert_eq!(job.samples_generated, 1);
    assert_eq!(job.samples_persisted, 1);
    assert!(job.completed_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_rate_limit_wait() {
    // Arrange: one call per minute
    let config = TestFixtures::config_with(
        vec![ProviderProfile::new(ProviderId::Groq, shared::RateLimits::new(1, 0), &[TestFixtures::MODEL_A])],
        vec![ProviderId::Groq],
    );
    let generator = Arc::new(ScriptedGenerator::always_ok());
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let orchestrator = BatchOrchestrator::new(TestFixtures::job(5), TestHelpers::cycle(), services, events_tx, stop_rx);
    let start = Instant::now();

    // Act
    let handle = tokio::spawn(orchestrator.run());
    tokio::time::sleep(Duration::from_secs(10)).await;
    stop_tx.send_replace(true);
    let job = handle.await.unwrap();

    // Assert
    assert_eq!(job.status, BatchStatus::Stopped);
    assert_eq!(generator.call_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(60), "stop waited out the rate window");
}

#[tokio::test(start_paused = true)]
async fn test_job_times_out() {
    // Arrange
    let mut config = TestFixtures::config();
    config.max_batch_timeout = Duration::from_secs(100);
    let generator = Arc::new(ScriptedGenerator::always_ok().with_latency(Duration::from_secs(30)));
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(100), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::TimedOut);
    assert_eq!(job.samples_generated, 4);
    assert_eq!(job.samples_persisted, 4);
    let last = job.errors.last().expect("timeout error");
    assert_eq!(last.kind, ErrorKind::Timeout);
    assert!(last.fatal);
}

#[tokio::test(start_paused = true)]
async fn test_hung_generation_call_times_out_and_switches() {
    // Arrange
    let mut config = TestFixtures::config();
    config.generation_timeout = Duration::from_secs(5);
    let generator = Arc::new(ScriptedGenerator::new(|request, _| {
        if request.model == TestFixtures::MODEL_A {
            Outcome::Hang
        } else {
            Outcome::Success(100)
        }
    }));
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());

    // Act
    let (job, _) = run_job(services, TestFixtures::job(2), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.model_switches.len(), 1);
    assert_eq!(job.model_switches[0].category, Some(ErrorCategory::Timeout));
    let calls = generator.calls();
    assert_eq!(calls[1].at.duration_since(calls[0].at), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_iteration_budget_ends_job_as_exhausted() {
    // Arrange: the only work item never validates
    let mut config = TestFixtures::config();
    config.failure_threshold = 100;
    let generator = Arc::new(ScriptedGenerator::new(|_, _| {
        Outcome::ContentError("reasoning has 1 steps, need 5".to_string())
    }));
    let services = TestHelpers::services(config, generator.clone(), TestHelpers::memory_store());
    let start = Instant::now();

    // Act
    let (job, _) = run_job(services, TestFixtures::job(2), TestHelpers::single_item_cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Exhausted);
    assert_eq!(job.iterations, 6);
    let last = job.errors.last().expect("budget error");
    assert_eq!(last.kind, ErrorKind::IterationBudget);
    assert!(last.fatal);
    assert!(job.skipped_items.contains(TestFixtures::VAT));
    // Waited for cooldowns instead of spinning through the budget
    assert!(start.elapsed() >= Duration::from_secs(600));
    assert_eq!(generator.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_failure_keeps_buffer_for_next_checkpoint() {
    // Arrange: first sample flush fails, later ones succeed
    let flushes = Arc::new(AtomicUsize::new(0));
    let flushed_samples = Arc::new(AtomicUsize::new(0));
    let mut store = MockBatchStore::new();
    store.expect_update().returning(|_| Ok(()));
    {
        let flushes = Arc::clone(&flushes);
        let flushed_samples = Arc::clone(&flushed_samples);
        store.expect_append_samples().returning(move |_, samples| {
            if flushes.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(OrchestratorError::persistence("append", "disk full"));
            }
            flushed_samples.fetch_add(samples.len(), Ordering::SeqCst);
            Ok(())
        });
    }
    let mut config = TestFixtures::config();
    config.checkpoint_interval = 2;
    let services = TestHelpers::services(config, Arc::new(ScriptedGenerator::always_ok()), Arc::new(store));

    // Act
    let (job, _) = run_job(services, TestFixtures::job(4), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.samples_generated, 4);
    assert_eq!(job.samples_persisted, 4);
    assert_eq!(flushes.load(Ordering::SeqCst), 2);
    assert_eq!(flushed_samples.load(Ordering::SeqCst), 4);
    let persistence_errors = job.errors.iter().filter(|e| e.kind == ErrorKind::Persistence).count();
    assert_eq!(persistence_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_final_flush_is_retried_then_given_up() {
    // Arrange
    let mut store = MockBatchStore::new();
    store.expect_update().returning(|_| Ok(()));
    store
        .expect_append_samples()
        .times(3)
        .returning(|_, _| Err(OrchestratorError::persistence("append", "read-only file system")));
    let services = TestHelpers::services(TestFixtures::config(), Arc::new(ScriptedGenerator::always_ok()), Arc::new(store));

    // Act
    let (job, events) = run_job(services, TestFixtures::job(3), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.samples_generated, 3);
    assert_eq!(job.samples_persisted, 0);
    assert_eq!(job.errors.len(), 3);
    TestHelpers::assert_single_terminal(&events);
}

#[tokio::test(start_paused = true)]
async fn test_job_update_failures_do_not_stop_generation() {
    // Arrange
    let mut store = MockBatchStore::new();
    store
        .expect_update()
        .returning(|_| Err(OrchestratorError::persistence("write", "permission denied")));
    store.expect_append_samples().returning(|_, _| Ok(()));
    let services = TestHelpers::services(TestFixtures::config(), Arc::new(ScriptedGenerator::always_ok()), Arc::new(store));

    // Act
    let (job, _) = run_job(services, TestFixtures::job(12), TestHelpers::cycle()).await;

    // Assert
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.samples_persisted, 12);
}
