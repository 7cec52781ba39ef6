//! Loading the bundled demo formulas.

use std::path::PathBuf;

use pour_lib::formula::{BuildStep, Category, Phase, Version};
use pour_lib::host::{HostCapabilities, Os, check_constraints};
use pour_lib::registry::Registry;

fn demo_formula_dir() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/formula")
}

#[test]
fn hear_loads_from_demo_dir() {
  let registry = Registry::load(&demo_formula_dir()).unwrap();
  let hear = registry.resolve("hear", None).unwrap();

  assert_eq!(hear.version.as_str(), "0.6");
  assert_eq!(hear.license.as_deref(), Some("BSD-3-Clause"));
  assert_eq!(hear.build_steps.len(), 2);
  assert!(matches!(&hear.build_steps[0], BuildStep::Mkdir { path } if path == "dst"));
  assert!(matches!(&hear.build_steps[1], BuildStep::Run(cmd) if cmd.program == "xcodebuild"));

  let categories: Vec<_> = hear.install_mappings.iter().map(|m| m.category).collect();
  assert_eq!(categories, vec![Category::Man(1), Category::Bin]);

  let xcode = &hear.dependencies[0];
  assert_eq!(xcode.name, "xcode");
  assert_eq!(xcode.phase, Phase::Build);
  // `ventura` is macOS 13.
  assert_eq!(hear.dependencies[1].min_version, Version::parse("13"));
  assert_eq!(hear.dependencies[1].phase, Phase::Runtime);
}

#[test]
fn hear_constraints_on_a_linux_host() {
  let registry = Registry::load(&demo_formula_dir()).unwrap();
  let hear = registry.resolve_reference("hear@0.6").unwrap();

  let report = check_constraints(hear, &HostCapabilities::new(Os::Linux));

  assert!(!report.is_satisfied());
  assert_eq!(report.fatal().count(), 1);
  assert_eq!(report.advisories().count(), 1);
}

#[test]
fn hear_constraints_on_a_recent_mac() {
  let registry = Registry::load(&demo_formula_dir()).unwrap();
  let hear = registry.resolve("hear", None).unwrap();
  let host = HostCapabilities::new(Os::MacOs)
    .with_os_version(Version::parse("14.4").unwrap())
    .with_tool("xcode", Version::parse("15.3").unwrap());

  let report = check_constraints(hear, &host);
  assert!(report.is_satisfied());
  assert_eq!(report.unmet().count(), 0);
}
