//! Version command implementation.

use untyped_core::error::UntypedResult;

use super::CommandContext;

/// Print version, build and toolchain information
pub async fn execute(ctx: &CommandContext) -> UntypedResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build_date = env!("BUILD_DATE");
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.print(&format!("untyped v{}", version));
    ctx.output.print(&format!("Built: {}", build_date));
    ctx.output.print(&format!("Target: {}", target));
    ctx.output.print(&format!("Rust: {}", env!("RUSTC_VERSION")));

    Ok(())
}
