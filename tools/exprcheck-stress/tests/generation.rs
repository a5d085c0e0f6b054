// Whole-run properties of the generator across the embedded profiles.

use exprcheck_frontend::Expr;
use exprcheck_sema::{EvalError, Target};
use exprcheck_stress::check::{Outcome, check, synthetic_frame};
use exprcheck_stress::{
    DefaultGeneratorRng, ExprGenerator, ExprKind, GenConfig, RecordingRng, ScriptedRng,
    WeightInfo, available_profiles, get_profile,
};

fn nodes(expr: &Expr) -> Vec<&Expr> {
    let mut out = vec![expr];
    for child in expr.children() {
        out.extend(nodes(child));
    }
    out
}

fn run(seed: u64, config: &GenConfig, count: usize) -> Vec<Expr> {
    let mut generator =
        ExprGenerator::new(DefaultGeneratorRng::new(seed), config.clone()).unwrap();
    (0..count).map(|_| generator.generate().unwrap()).collect()
}

#[test]
fn every_profile_terminates_and_is_deterministic() {
    for name in available_profiles() {
        let profile = get_profile(name).unwrap();
        for seed in 0..20 {
            let first = run(seed, &profile.generator, 10);
            let second = run(seed, &profile.generator, 10);
            assert_eq!(first, second, "profile {name}, seed {seed}");
        }
    }
}

#[test]
fn names_come_from_the_configuration() {
    let profile = get_profile("pointers").unwrap();
    let config = &profile.generator;
    for expr in run(7, config, 200) {
        for node in nodes(&expr) {
            match node {
                Expr::Variable(v) => {
                    let known = [
                        &config.var_name,
                        &config.array_name,
                        &config.struct_name,
                        &config.struct_ptr_name,
                    ];
                    assert!(known.contains(&&v.name), "unexpected variable {}", v.name);
                }
                Expr::MemberOf(m) => assert!(config.field_names.contains(&m.field)),
                Expr::MemberOfPtr(m) => assert!(config.field_names.contains(&m.field)),
                Expr::IntegerConstant(c) => {
                    assert!((config.int_const_min..=config.int_const_max).contains(&c.value))
                }
                _ => {}
            }
        }
    }
}

#[test]
fn deep_profile_respects_its_cap() {
    let profile = get_profile("deep").unwrap();
    let Some(max_depth) = profile.generator.max_depth else {
        panic!("deep profile has no max_depth");
    };
    for expr in run(3, &profile.generator, 100) {
        // Each level may add one parenthesis node on top of the kind itself.
        assert!(expr.depth() <= 2 * (max_depth + 2), "{expr}");
    }
}

#[test]
fn both_terminals_appear_under_default_weights() {
    let exprs = run(11, &GenConfig::default(), 200);
    let all: Vec<&Expr> = exprs.iter().flat_map(nodes).collect();
    assert!(all.iter().any(|e| matches!(e, Expr::IntegerConstant(_))));
    assert!(all.iter().any(|e| matches!(e, Expr::Variable(_))));
    assert!(all.iter().any(|e| matches!(e, Expr::Unary(_))));
    assert!(all.iter().any(|e| matches!(e, Expr::Binary(_))));
}

#[test]
fn disabled_kinds_never_appear() {
    let mut config = GenConfig::default();
    config
        .expr_kind_weights
        .set(ExprKind::VariableExpr, WeightInfo::ZERO);
    for expr in run(5, &config, 100) {
        assert!(
            nodes(&expr).iter().all(|e| !matches!(e, Expr::Variable(_))),
            "{expr}"
        );
    }
}

#[test]
fn recorded_choices_replay_the_same_run() {
    let profile = get_profile("arithmetic").unwrap();
    let mut recording = ExprGenerator::new(
        RecordingRng::new(DefaultGeneratorRng::new(99)),
        profile.generator.clone(),
    )
    .unwrap();
    let original: Vec<Expr> = (0..5).map(|_| recording.generate().unwrap()).collect();
    let choices = recording.into_rng().take_choices();

    let mut replay =
        ExprGenerator::new(ScriptedRng::new(choices), profile.generator).unwrap();
    let replayed: Vec<Expr> = (0..5).map(|_| replay.generate().unwrap()).collect();
    assert_eq!(original, replayed);
    assert_eq!(replay.rng_mut().remaining(), 0);
    assert_eq!(replay.rng_mut().mismatches(), 0);
}

#[test]
fn generated_names_resolve_in_the_synthetic_frame() {
    let target = Target::default();
    for name in available_profiles() {
        let profile = get_profile(name).unwrap();
        let frame = synthetic_frame(&target, &profile.generator);
        for expr in run(42, &profile.generator, 50) {
            let outcome = check(&target, &frame, &expr);
            assert!(
                !matches!(outcome, Outcome::Error(EvalError::UndefinedVariable { .. })),
                "profile {name}: {expr} {outcome}"
            );
        }
    }
}

#[test]
fn default_profile_finds_undefined_behavior_eventually() {
    let target = Target::default();
    let config = GenConfig::default();
    let frame = synthetic_frame(&target, &config);
    let found = run(1, &config, 2000)
        .iter()
        .any(|expr| matches!(check(&target, &frame, expr), Outcome::UndefinedBehavior(_)));
    assert!(found);
}

#[test]
fn member_access_evaluates_in_the_pointers_profile() {
    let target = Target::default();
    let profile = get_profile("pointers").unwrap();
    let frame = synthetic_frame(&target, &profile.generator);
    let mut members = 0;
    for expr in run(13, &profile.generator, 200) {
        members += nodes(&expr)
            .iter()
            .filter(|e| matches!(e, Expr::MemberOf(_) | Expr::MemberOfPtr(_)))
            .count();
        let outcome = check(&target, &frame, &expr);
        assert!(
            !matches!(
                outcome,
                Outcome::Error(EvalError::Unsupported { .. } | EvalError::NoMember { .. })
            ),
            "{expr} {outcome}"
        );
    }
    assert!(members > 0);
}
