use std::error::Error;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cloglog_bart::{ordinal_probabilities, CloglogBartSettings, CloglogOrdinalBart, OrdinalData};

#[allow(non_snake_case)]
fn main() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(2025);
    let n = 400;
    let p = 3;

    // Covariates and a true predictor lambda(x) = mean of the row
    let X = Array2::from_shape_fn((n, p), |_| rng.gen::<f64>() * 2.0 - 1.0);
    let lambda: Array1<f64> = X.mean_axis(Axis(1)).unwrap();

    // Three ordered categories with true cutpoints gamma = (0, ln 2)
    let gamma_true = [0.0, 2.0_f64.ln()];
    let y = Array1::from_iter(lambda.iter().map(|&l| {
        let probs = ordinal_probabilities(&gamma_true, l);
        let draw = rng.gen::<f64>();
        let mut acc = 0.0;
        for (k, p) in probs.iter().enumerate() {
            acc += p;
            if draw <= acc {
                return k;
            }
        }
        probs.len() - 1
    }));

    let data = OrdinalData::new(X, y)?;
    let settings = CloglogBartSettings {
        n_trees: 20,
        num_warmstart: 10,
        num_burnin: 100,
        num_mcmc: 100,
        seed: Some(42),
        ..CloglogBartSettings::default()
    };

    let mut model = CloglogOrdinalBart::new(settings);
    model.sample(&data, None)?;

    println!("retained draws : {}", model.n_retained());
    println!(
        "mean cutpoints : {:?}",
        model.gamma_samples().mean_axis(Axis(1)).unwrap()
    );

    let mean_pred = model.forest_pred_train().mean_axis(Axis(1)).unwrap();
    let gamma_mean = model.gamma_samples().mean_axis(Axis(1)).unwrap();
    let probs = ordinal_probabilities(gamma_mean.as_slice().unwrap(), mean_pred[0]);
    println!("category probabilities for the first row: {:?}", probs);

    Ok(())
}
