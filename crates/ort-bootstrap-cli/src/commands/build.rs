use anyhow::Result;
use ort_bootstrap::{
    AndroidPins, BuildPlanner, BuildTarget, CommandRunner, DepsLayout, EnvironmentProbe,
    run_builds,
};

/// Build and install ONNX Runtime for `target` from `_deps/onnxruntime-src`.
pub async fn run(
    runner: &dyn CommandRunner,
    probe: &dyn EnvironmentProbe,
    layout: &DepsLayout,
    pins: &AndroidPins,
    target: &BuildTarget,
) -> Result<()> {
    let facts = probe.facts();
    target.check_host(facts)?;

    let planner = BuildPlanner::new(layout, facts.os, pins);
    let script = planner.verify_sources()?;
    tracing::debug!("using build script {}", script.display());

    let invocations = planner.plan(target);
    run_builds(runner, &invocations).await?;

    for invocation in &invocations {
        println!(
            "{} installed to {}",
            invocation.label,
            invocation.install_dir.display()
        );
    }
    Ok(())
}
