//! Shared helpers for seedbed-fixtures integration tests.

#![allow(dead_code)]

pub mod shop;

use std::sync::Once;

use seedbed_db::{MemoryStore, WorkProvider};
use seedbed_fixtures::{FixtureRoot, FixtureRootOptions};

static INIT: Once = Once::new();

pub fn init_test_logging() {
	INIT.call_once(|| {
		let _ = env_logger::builder().is_test(true).try_init();
	});
}

/// Root over `store` with every shop factory and fixture declared, not loaded.
pub fn shop_root(store: &MemoryStore) -> FixtureRoot {
	FixtureRoot::new(shop_options(WorkProvider::scoped(store.clone())))
}

pub fn shop_options(provider: WorkProvider) -> FixtureRootOptions {
	FixtureRootOptions::new(provider).with_declarations(shop::declarations())
}
