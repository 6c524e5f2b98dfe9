use approx::assert_abs_diff_eq;
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cloglog_bart::auxiliary::AuxiliaryData;
use cloglog_bart::ordinal::{ordinal_probabilities, OrdinalError, OrdinalSampler};

// Three categories with cutpoints gamma = (0, ln 3), so the cumulative
// exponentiated boundaries are (0, 1, 4).
fn three_level_aux(n_obs: usize) -> AuxiliaryData {
    let mut aux = AuxiliaryData::new(n_obs, 0, 3);
    aux.gamma = array![0.0, 3.0_f64.ln()];
    OrdinalSampler::new(2.0, 2.0).update_cumulative_exp_sums(&mut aux);
    aux
}

#[test]
fn test_cumulative_exp_sums() {
    let aux = three_level_aux(1);

    assert_abs_diff_eq!(aux.cum_exp_gamma[0], 0.0);
    assert_abs_diff_eq!(aux.cum_exp_gamma[1], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(aux.cum_exp_gamma[2], 4.0, epsilon = 1e-12);
}

#[test]
fn test_closed_form_category_probabilities() {
    let probs = ordinal_probabilities(&[0.0, 3.0_f64.ln()], 0.0);

    assert_eq!(probs.len(), 3);
    assert_abs_diff_eq!(probs[0], 1.0 - (-1.0_f64).exp(), epsilon = 1e-12);
    assert_abs_diff_eq!(probs[1], (-1.0_f64).exp() - (-4.0_f64).exp(), epsilon = 1e-12);
    assert_abs_diff_eq!(probs[2], (-4.0_f64).exp(), epsilon = 1e-12);
    assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_probabilities_sum_to_one_under_shifted_predictor() {
    for lambda in [-2.0, -0.5, 0.0, 0.7, 3.0] {
        let probs = ordinal_probabilities(&[0.0, -1.0, 0.5, 2.0], lambda);
        assert_eq!(probs.len(), 5);
        assert!(probs.iter().all(|&p| p >= 0.0));
        assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_latent_draws_respect_truncation_intervals() {
    let sampler = OrdinalSampler::new(2.0, 2.0);
    let mut aux = three_level_aux(3);
    let y = array![0_usize, 1, 2];
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        sampler.update_latent(&mut aux, &y, &mut rng).unwrap();
        assert!(aux.latent[0] > 0.0 && aux.latent[0] <= 1.0);
        assert!(aux.latent[1] > 1.0 && aux.latent[1] <= 4.0);
        assert!(aux.latent[2] > 4.0);
    }
}

#[test]
fn test_latent_rejects_out_of_range_category() {
    let sampler = OrdinalSampler::new(2.0, 2.0);
    let mut aux = three_level_aux(3);
    let y = array![0_usize, 1, 5];
    let mut rng = StdRng::seed_from_u64(7);

    let err = sampler.update_latent(&mut aux, &y, &mut rng).unwrap_err();
    assert_eq!(
        err,
        OrdinalError::CategoryOutOfRange {
            category: 5,
            n_levels: 3
        }
    );
}

#[test]
fn test_latent_rejects_degenerate_interval() {
    let sampler = OrdinalSampler::new(2.0, 2.0);
    let mut aux = three_level_aux(3);
    aux.forest_pred[1] = f64::INFINITY;
    let y = array![0_usize, 1, 2];
    let mut rng = StdRng::seed_from_u64(7);

    let err = sampler.update_latent(&mut aux, &y, &mut rng).unwrap_err();
    assert_eq!(err, OrdinalError::EmptyTruncationInterval);
}

#[test]
fn test_gamma_update_keeps_identified_cutpoint_fixed() {
    let sampler = OrdinalSampler::new(2.0, 2.0);
    let n_obs = 30;
    let mut aux = AuxiliaryData::new(n_obs, 0, 3);
    sampler.update_cumulative_exp_sums(&mut aux);
    let y = Array1::from_iter((0..n_obs).map(|i| i / 10));
    let mut rng = StdRng::seed_from_u64(11);

    sampler.update_latent(&mut aux, &y, &mut rng).unwrap();
    sampler.update_gamma(&mut aux, &y, &mut rng).unwrap();
    sampler.update_cumulative_exp_sums(&mut aux);

    assert_eq!(aux.gamma[0], 0.0);
    assert!(aux.gamma[1].is_finite());
    for k in 1..aux.cum_exp_gamma.len() {
        assert!(aux.cum_exp_gamma[k] >= aux.cum_exp_gamma[k - 1]);
    }
}

#[test]
fn test_gamma_draw_respects_latent_truncation_bound() {
    let sampler = OrdinalSampler::new(2.0, 2.0);
    let n_obs = 60;
    let mut aux = AuxiliaryData::new(n_obs, 0, 3);
    sampler.update_cumulative_exp_sums(&mut aux);
    let y = Array1::from_iter((0..n_obs).map(|i| i / 20));
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..50 {
        sampler.update_latent(&mut aux, &y, &mut rng).unwrap();

        // With zero forest predictions the rescaled excess of a category-1
        // observation is z_i - c_1; the drawn boundary increment must
        // dominate every one of them.
        let c1 = aux.cum_exp_gamma[1];
        let bound = (0..n_obs)
            .filter(|&i| y[i] == 1)
            .map(|i| aux.latent[i] - c1)
            .fold(0.0_f64, f64::max);

        sampler.update_gamma(&mut aux, &y, &mut rng).unwrap();
        sampler.update_cumulative_exp_sums(&mut aux);

        assert!(aux.gamma[1].exp() >= bound - 1e-8);
    }
}
