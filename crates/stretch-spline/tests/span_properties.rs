//! Integration tests: calibrated spans against the engine's guarantees.
//!
//! Covers knot exactness, Ck continuity, clipping, knot insertion,
//! monotonicity of limited slopes, the zig-zag co-monotonicity scenario and
//! flat data for every basis family.

use approx::assert_relative_eq;
use proptest::prelude::*;
use stretch_spline::prelude::*;

// =============================================================================
// HELPERS
// =============================================================================

fn floating(x: &[f64], y: &[f64]) -> Span {
    SpanBuilder::new("floating").create_calibrated(x, y).unwrap()
}

fn every_family() -> Vec<SegmentBuilderParams> {
    let mut params: Vec<SegmentBuilderParams> = [
        BasisSetParams::Polynomial { degree: 3 },
        BasisSetParams::Polynomial { degree: 5 },
        BasisSetParams::BernsteinPolynomial { degree: 3 },
        BasisSetParams::BernsteinPolynomial { degree: 4 },
        BasisSetParams::HyperbolicTension { tension: 1.0 },
        BasisSetParams::ExponentialTension { tension: 2.0 },
        BasisSetParams::KaklisPandelis { exponent: 2 },
    ]
    .into_iter()
    .map(SegmentBuilderParams::new)
    .collect();
    // higher Kaklis-Pandelis exponents only carry C1 continuity
    params.push(
        SegmentBuilderParams::new(BasisSetParams::KaklisPandelis { exponent: 4 })
            .with_design(SegmentDesign::with_ck(1)),
    );
    params
}

/// Strictly increasing ordinates with gaps in `[0.2, 2]` and bounded responses.
fn knot_data() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (3usize..7).prop_flat_map(|n| {
        (
            proptest::collection::vec(0.2f64..2.0, n - 1),
            proptest::collection::vec(-5.0f64..5.0, n),
        )
            .prop_map(|(gaps, y)| {
                let mut x = vec![0.0];
                for gap in gaps {
                    let last = x[x.len() - 1];
                    x.push(last + gap);
                }
                (x, y)
            })
    })
}

// =============================================================================
// EXACTNESS AND CONTINUITY
// =============================================================================

#[test]
fn test_every_family_interpolates_knots() {
    let x = [0.0, 0.7, 1.5, 3.0, 4.2];
    let y = [1.0, -0.5, 2.0, 2.5, 0.0];
    for params in every_family() {
        for boundary in [
            BoundaryCondition::Floating,
            BoundaryCondition::Natural,
            BoundaryCondition::Financial,
        ] {
            let span = SpanBuilder::new("family")
                .with_params(params)
                .with_boundary(boundary)
                .create_calibrated(&x, &y)
                .unwrap();
            for (&xi, &yi) in x.iter().zip(&y) {
                assert_relative_eq!(
                    span.response_value(xi).unwrap(),
                    yi,
                    epsilon = 1e-9,
                    max_relative = 1e-9
                );
            }
        }
    }
}

#[test]
fn test_shape_controlled_span_interpolates() {
    let params = SegmentBuilderParams::new(BasisSetParams::cubic())
        .with_shape(ShapeControl::local(ShapeFunction::QuadraticRational(0.5)));
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [1.0, 1.5, 1.2, 2.0];
    let span = SpanBuilder::new("shaped")
        .with_params(params)
        .create_calibrated(&x, &y)
        .unwrap();
    for (&xi, &yi) in x.iter().zip(&y) {
        assert_relative_eq!(span.response_value(xi).unwrap(), yi, epsilon = 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_knot_exactness((x, y) in knot_data()) {
        let span = floating(&x, &y);
        for (&xi, &yi) in x.iter().zip(&y) {
            let value = span.response_value(xi).unwrap();
            prop_assert!((value - yi).abs() <= 1e-9 * (1.0 + yi.abs()), "{value} != {yi}");
        }
    }

    #[test]
    fn prop_ck_continuity((x, y) in knot_data()) {
        let span = floating(&x, &y);
        for pair in span.segments().windows(2) {
            let knot = pair[0].right();
            let ck = pair[0].design().ck.min(pair[1].design().ck);
            for order in 0..=ck {
                let left = pair[0].response_value_derivative(knot, order).unwrap();
                let right = pair[1].response_value_derivative(knot, order).unwrap();
                prop_assert!(
                    (left - right).abs() <= 1e-7 * (1.0 + left.abs()),
                    "order {order} at {knot}: {left} != {right}"
                );
            }
        }
    }

    #[test]
    fn prop_clip_right_matches((x, y) in knot_data(), fraction in 0.05f64..0.95) {
        let span = floating(&x, &y);
        let (left, right) = span.domain();
        let cut = left + fraction * (right - left);
        let clipped = span.clip_right("clipped", cut).unwrap();
        prop_assert_eq!(clipped.domain(), (left, cut));
        for k in 0..=10 {
            let t = (left + (cut - left) * f64::from(k) / 10.0).min(cut);
            let original = span.response_value(t).unwrap();
            let kept = clipped.response_value(t).unwrap();
            prop_assert!((original - kept).abs() <= 1e-8 * (1.0 + original.abs()));
        }
    }
}

// =============================================================================
// CLIPPING AND KNOTS
// =============================================================================

#[test]
fn test_clip_left_then_clip_left_again() {
    let x = [0.0, 1.0, 2.0, 3.0, 4.0];
    let y = [0.0, 1.0, 4.0, 9.0, 16.0];
    let span = floating(&x, &y);

    let once = span.clip_left("once", 0.5).unwrap();
    let twice = once.clip_left("twice", 2.5).unwrap();
    let direct = span.clip_left("direct", 2.5).unwrap();
    for &t in &[2.5, 3.0, 3.3, 4.0] {
        assert_relative_eq!(
            twice.response_value(t).unwrap(),
            direct.response_value(t).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_clip_every_family_reproduces() {
    let x = [0.0, 0.7, 1.5, 3.0, 4.2];
    let y = [1.0, -0.5, 2.0, 2.5, 0.0];
    let mut families = every_family();
    families.push(SegmentBuilderParams::new(BasisSetParams::HyperbolicTension { tension: 3.0 }));
    families.push(SegmentBuilderParams::new(BasisSetParams::ExponentialTension { tension: 3.0 }));
    families.push(
        SegmentBuilderParams::new(BasisSetParams::cubic())
            .with_shape(ShapeControl::local(ShapeFunction::QuadraticRational(2.0))),
    );

    for params in families {
        let span = SpanBuilder::new("family")
            .with_params(params)
            .create_calibrated(&x, &y)
            .unwrap();
        let left = span.clip_left("left", 1.8).unwrap();
        let right = span.clip_right("right", 1.8).unwrap();

        for k in 0..=40 {
            let t = (4.2 * f64::from(k) / 40.0).min(4.2);
            let original = span.response_value(t).unwrap();
            let clipped = if t < 1.8 { &right } else { &left };
            let kept = clipped.response_value(t).unwrap();
            assert!(
                (original - kept).abs() <= 1e-8 * (1.0 + original.abs()),
                "{params:?} at {t}: {kept} != {original}"
            );
        }
    }
}

#[test]
fn test_knot_insertion_invariance() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [2.0, 1.0, 3.0, 2.5];
    let span = floating(&x, &y);

    for inserted in [
        span.insert_knot(0.4, &EdgeDerivatives::with_slope(1.7, 0.3)).unwrap(),
        span.insert_cardinal_knot(2.6, 3.1, 0.25).unwrap(),
        span.insert_catmull_rom_knot(1.5, 2.2).unwrap(),
    ] {
        assert_eq!(inserted.segment_count(), 4);
        for (&xi, &yi) in x.iter().zip(&y) {
            assert_relative_eq!(inserted.response_value(xi).unwrap(), yi, epsilon = 1e-9);
        }
    }
    let plain = span
        .insert_knot(0.4, &EdgeDerivatives::value_only(1.7))
        .unwrap();
    assert_relative_eq!(plain.response_value(0.4).unwrap(), 1.7, epsilon = 1e-10);
}

// =============================================================================
// MONOTONICITY
// =============================================================================

#[test]
fn test_hyman83_monotone_data() {
    let span = SpanBuilder::new("hyman")
        .create_local_control(
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            SlopeGenerator::Hyman83,
        )
        .unwrap();
    assert!(span.is_locally_monotone().unwrap());
    for segment in span.segments() {
        assert_eq!(segment.monotone_type().unwrap(), Monotonicity::Monotonic);
    }

    let uneven = SpanBuilder::new("hyman")
        .create_local_control(
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            &[0.0, 0.5, 1.0, 2.5, 3.0, 3.2],
            SlopeGenerator::Hyman83,
        )
        .unwrap();
    assert!(uneven.is_locally_monotone().unwrap());
}

#[test]
fn test_bessel_overshoots_where_hyman_does_not() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [0.0, 0.0, 1.0, 1.0];
    let bessel = SpanBuilder::new("bessel")
        .create_local_control(&x, &y, SlopeGenerator::Bessel)
        .unwrap();
    let hyman = SpanBuilder::new("hyman")
        .create_local_control(&x, &y, SlopeGenerator::Hyman83)
        .unwrap();
    assert!(!bessel.is_locally_monotone().unwrap());
    assert!(hyman.is_locally_monotone().unwrap());
}

#[test]
fn test_zigzag_co_monotone() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [0.0, 1.0, 0.0, 1.0];
    let span = SpanBuilder::new("zigzag")
        .create_local_control(&x, &y, SlopeGenerator::Bessel)
        .unwrap();

    // Bessel puts flat slopes on both interior knots, so every segment is
    // monotone and the extrema sit exactly on the knots.
    for segment in span.segments() {
        assert_eq!(segment.monotone_type().unwrap(), Monotonicity::Monotonic);
    }
    assert!(span.is_co_monotone(&[0.0, 1.0, 0.0, 1.0]).unwrap());
    assert!(!span.is_co_monotone(&[0.0, 1.0, 2.0, 1.0]).unwrap());
    assert!(span.is_co_monotone(&[0.0, 1.0]).is_err());
}

#[test]
fn test_interior_extremum_is_co_monotone() {
    let span = floating(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]);
    assert!(span.is_co_monotone(&[0.0, 1.0, 0.0]).unwrap());
    assert!(!span.is_locally_monotone().unwrap());
}

// =============================================================================
// FLAT DATA
// =============================================================================

#[test]
fn test_flat_data_every_family() {
    let x = [0.0, 5.0, 10.0];
    let y = [3.0, 3.0, 3.0];
    for params in every_family() {
        for boundary in [BoundaryCondition::Floating, BoundaryCondition::Natural] {
            let span = SpanBuilder::new("flat")
                .with_params(params)
                .with_boundary(boundary)
                .create_calibrated(&x, &y)
                .unwrap();
            for k in 0..=20 {
                let t = 0.5 * f64::from(k);
                assert_relative_eq!(span.response_value(t).unwrap(), 3.0, epsilon = 1e-9);
                for order in 1..=3 {
                    assert_relative_eq!(
                        span.response_value_derivative(t, order).unwrap(),
                        0.0,
                        epsilon = 1e-8
                    );
                }
            }
            assert!(span.is_locally_monotone().unwrap());
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_invalid_input_reported() {
    let builder = SpanBuilder::new("bad");
    assert!(matches!(
        builder.create_calibrated(&[0.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
        Err(SplineError::InvalidInput { .. })
    ));
    assert!(matches!(
        builder.create_calibrated(&[0.0, f64::NAN], &[1.0, 2.0]),
        Err(SplineError::InvalidInput { .. })
    ));
    assert!(matches!(
        builder.create_calibrated(&[0.0, 1.0], &[1.0]),
        Err(SplineError::InvalidInput { .. })
    ));
    assert!("Spline".parse::<BasisFamily>().is_err());
}

#[test]
fn test_out_of_domain() {
    let span = floating(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]);
    assert!(matches!(
        span.response_value(-0.1),
        Err(SplineError::OutOfDomain { .. })
    ));
    assert!(matches!(
        span.response_value_derivative(2.1, 1),
        Err(SplineError::OutOfDomain { .. })
    ));
}
