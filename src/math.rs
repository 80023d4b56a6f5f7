use itertools::izip;

/// Step used for the central difference gradient.
const GRADIENT_EPSILON: f64 = 1e-6;

/// Offsets (in units of epsilon) and weights of the 4th order stencil.
const HESSIAN_STENCIL: [(f64, f64); 4] = [
    (-2., 1. / 12.),
    (-1., -2. / 3.),
    (1., 2. / 3.),
    (2., -1. / 12.),
];

/// Central finite difference gradient of `f` at `position`.
///
/// Returns the value of `f` at `position`.
pub(crate) fn central_gradient<E, F>(
    mut f: F,
    position: &[f64],
    gradient: &mut [f64],
) -> Result<f64, E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    assert!(gradient.len() == position.len());

    let value = f(position)?;
    let mut perturbed = position.to_vec();
    for (i, grad) in gradient.iter_mut().enumerate() {
        let h = GRADIENT_EPSILON * position[i].abs().max(1.);
        perturbed[i] = position[i] + h;
        let upper = f(&perturbed)?;
        perturbed[i] = position[i] - h;
        let lower = f(&perturbed)?;
        perturbed[i] = position[i];
        *grad = (upper - lower) / (2. * h);
    }
    Ok(value)
}

/// Symmetric finite difference Hessian built from gradient evaluations.
///
/// `grad` must write the gradient at its first argument into the second.
/// The result is stored row major in `hessian`.
pub(crate) fn stencil_hessian<E, G>(
    mut grad: G,
    position: &[f64],
    epsilon: f64,
    hessian: &mut [f64],
) -> Result<(), E>
where
    G: FnMut(&[f64], &mut [f64]) -> Result<f64, E>,
{
    let dim = position.len();
    assert!(hessian.len() == dim * dim);

    hessian.fill(0.);
    let mut perturbed = position.to_vec();
    let mut temp_grad = vec![0f64; dim];
    for d in 0..dim {
        for &(offset, weight) in HESSIAN_STENCIL.iter() {
            perturbed[d] = position[d] + offset * epsilon;
            grad(&perturbed, &mut temp_grad)?;
            for (dd, &g) in temp_grad.iter().enumerate() {
                let contribution = 0.5 * weight * g / epsilon;
                hessian[d * dim + dd] += contribution;
                hessian[dd * dim + d] += contribution;
            }
        }
        perturbed[d] = position[d];
    }
    Ok(())
}

pub(crate) fn axpy_out(x: &[f64], y: &[f64], a: f64, out: &mut [f64]) {
    assert!(x.len() == y.len());
    assert!(x.len() == out.len());

    izip!(x, y, out).for_each(|(x, y, out)| {
        *out = a * x + y;
    });
}

pub(crate) fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|val| val.is_finite())
}
