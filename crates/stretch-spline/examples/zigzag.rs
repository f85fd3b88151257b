//! Zig-zag knot data calibrated with every slope generator and boundary.
//!
//! Run with: RUST_LOG=debug cargo run -p stretch-spline --example zigzag

use tracing_subscriber::EnvFilter;

use stretch_spline::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [0.0, 1.0, 0.0, 1.0];

    println!("Local-control spans");
    println!("{:<14} {:>10} {:>12}", "generator", "monotone", "co-monotone");
    for generator in SlopeGenerator::ALL {
        let span = SpanBuilder::new(generator.name()).create_local_control(&x, &y, generator)?;
        println!(
            "{:<14} {:>10} {:>12}",
            generator.name(),
            span.is_locally_monotone()?,
            span.is_co_monotone(&y)?
        );
    }

    println!();
    println!("Sequential spans");
    for boundary in [
        BoundaryCondition::Floating,
        BoundaryCondition::Natural,
        BoundaryCondition::Financial,
    ] {
        let span = SpanBuilder::new("zigzag")
            .with_boundary(boundary)
            .create_calibrated(&x, &y)?;
        let sensitivity = span.jack_dresponse_dknot_responses(1.5)?;
        let row: Vec<String> = sensitivity.iter().map(|v| format!("{v:+.4}")).collect();
        println!(
            "{boundary:<10} y(1.5) = {:+.6}  dy/dknots = [{}]",
            span.response_value(1.5)?,
            row.join(", ")
        );
    }

    Ok(())
}
