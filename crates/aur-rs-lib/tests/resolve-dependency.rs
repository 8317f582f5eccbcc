use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use aur_rs::dependency_resolver::*;
use aur_rs::local_index::LocalDb;
use aur_rs::registry::RetryPolicy;
use aur_rs_test_utils::*;

fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

fn no_backoff() -> RetryPolicy {
	RetryPolicy::new(3, Duration::ZERO)
}

fn position(order: &[String], name: &str) -> usize {
	order.iter().position(|n| n == name).unwrap_or_else(|| panic!("{} not in install order", name))
}

#[tokio::test]
async fn resolve_iup() {
	init_logging();
	let registry = Arc::new(MockRegistry::new(iup_records()));
	let resolver = ResolverBuilder::new(registry, Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.build();

	let finalized = resolver.resolve().await.unwrap();

	let names = finalized.table().names().collect::<HashSet<_>>();
	assert_eq!(names, IUP_CLOSURE.into_iter().collect::<HashSet<_>>());
	assert_eq!(finalized.graph().vertex_count(), 12);
	assert!(finalized.graph().is_acyclic());

	let order = finalized.install_order();
	assert_eq!(order.len(), 12);
	assert_eq!(order.last().map(String::as_str), Some("iup"));
	for (dependent, dependency) in finalized.graph().edges() {
		assert!(position(order, dependency) < position(order, dependent), "{} must come before {}", dependency, dependent);
	}
	assert!(position(order, "pdflib-lite") < position(order, "libcd"));

	assert!(finalized.missing().iter().any(|n| n == "gtk3"));
	assert!(finalized.missing().iter().any(|n| n == "lua53"));
	assert!(finalized.failed().is_empty());
	assert_eq!(finalized.explicit(), ["iup".to_string()]);
}

#[tokio::test]
async fn build_targets_collapse_split_packages() {
	let resolver = ResolverBuilder::new(Arc::new(MockRegistry::new(iup_records())), Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.build();
	let finalized = resolver.resolve().await.unwrap();

	let bases = finalized.build_targets().iter().map(|r| r.package_base.as_str()).collect::<Vec<_>>();
	assert_eq!(bases.len(), 6);
	assert_eq!(bases.iter().collect::<HashSet<_>>().len(), 6);
	assert_eq!(bases.last(), Some(&"iup"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolve_is_idempotent() {
	let registry = Arc::new(MockRegistry::new(iup_records()));
	let resolver = ResolverBuilder::new(registry, Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.max_concurrent_requests(4)
		.build();

	let first = resolver.resolve().await.unwrap();
	let second = resolver.resolve().await.unwrap();
	assert_eq!(first.table(), second.table());
	assert_eq!(first.install_order(), second.install_order());
}

#[tokio::test]
async fn shared_dependency_is_fetched_once() {
	let registry = Arc::new(MockRegistry::new([
		package("app", "1.0-1").depends(&["left", "right"]).build(),
		package("left", "1.0-1").depends(&["shared"]).build(),
		package("right", "1.0-1").make_depends(&["shared"]).build(),
		package("shared", "1.0-1").build(),
	]));
	let resolver = ResolverBuilder::new(registry.clone(), Arc::new(MockLocalIndex::default()))
		.add_packages(["app", "app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();

	assert_eq!(registry.requested_names().iter().filter(|n| *n == "shared").count(), 1);
	assert_eq!(finalized.table().len(), 4);
	assert_eq!(finalized.graph().vertices().filter(|n| *n == "shared").count(), 1);
	assert_eq!(finalized.graph().edges().filter(|(_, to)| *to == "shared").count(), 2);
	assert_eq!(finalized.explicit().len(), 1);
	assert_eq!(finalized.dependencies().collect::<Vec<_>>().len(), 3);
	assert_eq!(registry.info_calls(), 3);
}

#[tokio::test]
async fn versioned_and_bare_dependency_fetched_once() {
	let registry = Arc::new(MockRegistry::new([
		package("app", "1.0-1").depends(&["foo", "foo>=1.0"]).build(),
		package("foo", "1.0-1").build(),
	]));
	let resolver = ResolverBuilder::new(registry.clone(), Arc::new(MockLocalIndex::default()))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();

	assert_eq!(registry.requested_names(), ["app".to_string(), "foo".to_string()]);
	assert_eq!(finalized.install_order(), ["foo".to_string(), "app".to_string()]);
}

#[tokio::test]
async fn bare_dependency_keeps_locally_satisfied_package() {
	let registry = Arc::new(MockRegistry::new([
		package("app", "1.0-1").depends(&["foo>=1.0", "foo"]).build(),
		package("foo", "1.0-1").build(),
	]));
	let resolver = ResolverBuilder::new(registry.clone(), Arc::new(MockLocalIndex::new(&[("foo", "1.0-1")])))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();

	assert_eq!(registry.requested_names().iter().filter(|n| *n == "foo").count(), 1);
	assert!(finalized.table().contains("foo"));
	assert_eq!(finalized.install_order(), ["foo".to_string(), "app".to_string()]);
}

#[tokio::test]
async fn versioned_dependency_on_requested_name_is_still_checked() {
	let registry = Arc::new(MockRegistry::new([
		package("app", "1.0-1").depends(&["foo", "foo>=2.0"]).build(),
		package("foo", "1.0-1").build(),
	]));
	let resolver = ResolverBuilder::new(registry.clone(), Arc::new(MockLocalIndex::default()))
		.add_packages(["app"])
		.build();
	assert!(matches!(resolver.resolve().await, Err(ResolveError::UnsatisfiableConstraint { .. })));
	assert_eq!(registry.requested_names().iter().filter(|n| *n == "foo").count(), 1);
}

#[tokio::test]
async fn check_dependencies_are_gathered() {
	let registry = Arc::new(MockRegistry::new([
		package("app", "1.0-1").check_depends(&["testlib"]).build(),
		package("testlib", "1.0-1").build(),
	]));
	let resolver = ResolverBuilder::new(registry, Arc::new(MockLocalIndex::default()))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();

	assert!(finalized.table().contains("testlib"));
	assert!(finalized.graph().contains_edge("app", "testlib"));
	assert_eq!(finalized.install_order(), ["testlib".to_string(), "app".to_string()]);
}

#[tokio::test]
async fn versioned_check_dependency() {
	let records = |remote: &str| Arc::new(MockRegistry::new([
		package("app", "1.0-1").check_depends(&["testlib>=2.0"]).build(),
		package("testlib", remote).build(),
	]));

	let finalized = ResolverBuilder::new(records("2.1-1"), Arc::new(MockLocalIndex::new(&[("testlib", "1.0-1")])))
		.add_packages(["app"])
		.build()
		.resolve()
		.await
		.unwrap();
	assert_eq!(finalized.install_order(), ["testlib".to_string(), "app".to_string()]);

	let result = ResolverBuilder::new(records("1.5-1"), Arc::new(MockLocalIndex::default()))
		.add_packages(["app"])
		.build()
		.resolve()
		.await;
	match result {
		Err(ResolveError::UnsatisfiableConstraint { dependent, constraint, .. }) => {
			assert_eq!(dependent, "app");
			assert_eq!(constraint.to_string(), "testlib>=2.0");
		},
		other => panic!("expected an unsatisfiable constraint, got {:?}", other.map(|f| f.install_order().to_vec())),
	}
}

#[tokio::test]
async fn cycle_requires_manual_intervention() {
	init_logging();
	let registry = Arc::new(MockRegistry::new([
		package("a", "1.0-1").depends(&["b"]).build(),
		package("b", "1.0-1").depends(&["a"]).build(),
	]));
	let resolver = ResolverBuilder::new(registry, Arc::new(MockLocalIndex::default()))
		.add_packages(["a"])
		.build();

	match resolver.resolve().await {
		Err(e @ ResolveError::CyclicDependency(_)) => {
			assert!(e.requires_manual_intervention());
			if let ResolveError::CyclicDependency(members) = e {
				assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
			}
		},
		other => panic!("expected a cycle, got {:?}", other.map(|f| f.install_order().to_vec())),
	}
}

fn constrained_registry(constraint: &str, remote_version: &str) -> Arc<MockRegistry> {
	Arc::new(MockRegistry::new([
		package("app", "1.0-1").depends(&[constraint]).build(),
		package("foo", remote_version).build(),
	]))
}

#[tokio::test]
async fn newer_remote_is_downloaded() {
	let resolver = ResolverBuilder::new(constrained_registry("foo>=2.0", "2.1"), Arc::new(MockLocalIndex::new(&[("foo", "1.5")])))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert!(finalized.table().contains("foo"));
	assert_eq!(finalized.install_order(), ["foo".to_string(), "app".to_string()]);
}

#[tokio::test]
async fn installed_version_satisfies() {
	let resolver = ResolverBuilder::new(constrained_registry("foo>=2.0", "2.1"), Arc::new(MockLocalIndex::new(&[("foo", "2.0")])))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert!(!finalized.table().contains("foo"));
	assert!(!finalized.graph().contains_vertex("foo"));
	assert_eq!(finalized.install_order(), ["app".to_string()]);
}

#[tokio::test]
async fn installed_version_from_local_db() {
	let db_dir = local_db(&[("foo", "2.0-1")]).unwrap();
	let local = LocalDb::open(db_dir.path()).unwrap();
	let resolver = ResolverBuilder::new(constrained_registry("foo>=2.0", "2.1-1"), Arc::new(local))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert_eq!(finalized.install_order(), ["app".to_string()]);
}

#[tokio::test]
async fn malformed_local_entry_keeps_other_packages() {
	let db_dir = local_db(&[("foo", "1.0-1"), ("bar", "2.0-1")]).unwrap();
	let junk = db_dir.path().join("local").join("junk-1-1");
	std::fs::create_dir_all(&junk).unwrap();
	std::fs::write(junk.join("desc"), "%VERSION%\n1-1\n\n").unwrap();

	let local = LocalDb::open(db_dir.path()).unwrap();
	let resolver = ResolverBuilder::new(constrained_registry("foo=1.0", "2.0-1"), Arc::new(local))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert_eq!(finalized.install_order(), ["app".to_string()]);
}

#[tokio::test]
async fn unsatisfiable_constraint_aborts() {
	let resolver = ResolverBuilder::new(constrained_registry("foo=1.0", "2.0"), Arc::new(MockLocalIndex::default()))
		.add_packages(["app"])
		.build();
	match resolver.resolve().await {
		Err(ResolveError::UnsatisfiableConstraint { dependent, constraint, remote_version, local_version }) => {
			assert_eq!(dependent, "app");
			assert_eq!(constraint.to_string(), "foo=1.0");
			assert_eq!(remote_version, "2.0");
			assert_eq!(local_version, None);
		},
		other => panic!("expected an unsatisfiable constraint, got {:?}", other.map(|f| f.install_order().to_vec())),
	}
}

#[tokio::test]
async fn unreadable_local_entry_is_not_installed() {
	let local = MockLocalIndex::new(&[("foo", "2.0")]).broken("foo");
	let resolver = ResolverBuilder::new(constrained_registry("foo>=2.0", "2.1"), Arc::new(local))
		.add_packages(["app"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert!(finalized.table().contains("foo"));
}

#[tokio::test]
async fn unknown_package_resolves_to_nothing() {
	let resolver = ResolverBuilder::new(Arc::new(MockRegistry::new(iup_records())), Arc::new(MockLocalIndex::default()))
		.add_packages(["ghost"])
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert!(finalized.table().is_empty());
	assert!(finalized.install_order().is_empty());
	assert!(finalized.explicit().is_empty());
	assert_eq!(finalized.missing(), ["ghost".to_string()]);
}

#[tokio::test]
async fn transient_failure_is_retried() {
	init_logging();
	let registry = Arc::new(MockRegistry::new(iup_records()).fail_transiently("iup", 2));
	let resolver = ResolverBuilder::new(registry.clone(), Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.retry_policy(no_backoff())
		.build();
	let finalized = resolver.resolve().await.unwrap();
	assert_eq!(finalized.table().len(), 12);
	assert!(finalized.failed().is_empty());
	assert_eq!(registry.requested_names().iter().filter(|n| *n == "iup").count(), 3);
}

#[tokio::test]
async fn exhausted_retries_are_reported() {
	let registry = Arc::new(MockRegistry::new(iup_records()).fail_always("libim"));
	let resolver = ResolverBuilder::new(registry, Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.retry_policy(RetryPolicy::new(2, Duration::ZERO))
		.info_batch_size(1)
		.build();
	let finalized = resolver.resolve().await.unwrap();

	assert!(!finalized.table().contains("libim"));
	assert!(finalized.table().contains("lua-im"));
	assert_eq!(finalized.table().len(), 11);
	assert!(finalized.failed().iter().flat_map(|f| f.names.iter()).any(|n| n == "libim"));
	assert!(!finalized.missing().iter().any(|n| n == "libim"));
}

#[tokio::test]
async fn lookup_many_batches_and_retries() {
	let registry = MockRegistry::new(iup_records()).fail_transiently("iup", 1);
	let local = MockLocalIndex::default();
	let names = ["iup", "libcd", "ghost"].map(String::from);
	let found = MetadataGatherer::new(&registry, &local)
		.retry_policy(no_backoff())
		.batch_size(2)
		.lookup_many(&names)
		.await;

	assert_eq!(found.table.names().collect::<Vec<_>>(), ["iup", "libcd"]);
	assert_eq!(found.missing, ["ghost".to_string()]);
	assert!(found.failed.is_empty());
	assert_eq!(registry.info_calls(), 3);
}

#[tokio::test]
async fn lookup_many_reports_exhausted_batches() {
	let registry = MockRegistry::new(iup_records()).fail_always("ghost");
	let local = MockLocalIndex::default();
	let names = ["iup", "libcd", "ghost"].map(String::from);
	let found = MetadataGatherer::new(&registry, &local)
		.retry_policy(RetryPolicy::new(2, Duration::ZERO))
		.batch_size(2)
		.lookup_many(&names)
		.await;

	assert_eq!(found.table.len(), 2);
	assert!(found.missing.is_empty());
	assert_eq!(found.failed.len(), 1);
	assert_eq!(found.failed[0].names, ["ghost".to_string()]);
}

#[tokio::test]
async fn dot_export_names_every_vertex() {
	let resolver = ResolverBuilder::new(Arc::new(MockRegistry::new(iup_records())), Arc::new(MockLocalIndex::default()))
		.add_packages(["iup"])
		.build();
	let dot = resolver.resolve().await.unwrap().get_graph().to_dot();
	for name in IUP_CLOSURE {
		assert!(dot.contains(&format!("[label=\"{}\"]", name)), "{} missing from DOT output", name);
	}
}
