use crate::symmetrize::{
    ClusterSymmetry, SpDomain, SpFunction, SpScalar, SymmetrizeError, SYMMETRY_TOLERANCE,
};
use itertools::Itertools;
use ndarray::{Array3, ArrayViewMut3, Ix3};

/// Whether a domain can sit on the trailing axes of a symmetrizable function.
fn is_fiber_domain(domain: SpDomain) -> bool {
    !matches!(domain, SpDomain::Band(_) | SpDomain::Spin)
}

fn domain_label(domain: SpDomain) -> &'static str {
    match domain {
        SpDomain::ImaginaryTime(_) => "imaginary-time",
        SpDomain::Matsubara(_) => "Matsubara-frequency",
        SpDomain::VertexFrequency(_) => "vertex-frequency",
        SpDomain::VertexFrequencyExtended(_) => "extended-vertex-frequency",
        SpDomain::RealFrequency(_) => "real-frequency",
        SpDomain::RealSpaceCluster(_) => "real-space-cluster",
        SpDomain::MomentumCluster(_) => "momentum-cluster",
        SpDomain::Band(_) => "band",
        SpDomain::Spin => "spin",
    }
}

fn report_residual(do_diff: bool, residual: f64, domain: &str, name: &str) {
    if do_diff && residual > SYMMETRY_TOLERANCE {
        log::warn!(
            "difference detected in the {} domain of {}: {:.3e}",
            domain,
            name,
            residual
        );
    }
}

/// Project a single-particle function onto its symmetric subspace. The passes
/// applied are selected by the function's domain product; cluster domains
/// need the precomputed `symmetry` table. Returns the largest residual
/// measured before symmetrization; with `do_diff` set, residuals above
/// [`SYMMETRY_TOLERANCE`] are also logged. Applying the projection twice
/// leaves the values unchanged up to that tolerance.
pub fn symmetrize_single_particle<S: SpScalar>(
    f: &mut SpFunction<S>,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let domains: Vec<SpDomain> = f.domains().to_vec();
    match *domains.as_slice() {
        [d] if is_fiber_domain(d) => single_domain(f, d, symmetry, do_diff),
        [SpDomain::Band(_), SpDomain::Band(_), d] if is_fiber_domain(d) => {
            band_pair_single(f, d, symmetry, do_diff)
        }
        [SpDomain::Band(_), SpDomain::Band(_), d0, d1]
            if is_fiber_domain(d0) && is_fiber_domain(d1) =>
        {
            band_pair_double(f, d0, d1, symmetry, do_diff)
        }
        [SpDomain::Band(_), SpDomain::Spin, SpDomain::Band(_), SpDomain::Spin, d]
            if is_fiber_domain(d) =>
        {
            orbital_spin_single(f, d, symmetry, do_diff)
        }
        [SpDomain::Band(_), SpDomain::Spin, SpDomain::Band(_), SpDomain::Spin, d0, d1]
            if is_fiber_domain(d0) && is_fiber_domain(d1) =>
        {
            orbital_spin_double(f, d0, d1, symmetry, do_diff)
        }
        _ => Err(SymmetrizeError::UnsupportedSignature(domains.clone())),
    }
}

/// Anti-periodicity over half the axis: `f(i) <- (f(i) - f(i + n/2)) / 2`,
/// `f(i + n/2) <- -f(i)`. Returns `max_i |(f(i) + f(i + n/2)) / 2|`.
fn time_fiber<S: SpScalar>(f: &mut [S]) -> f64 {
    let shift = f.len() / 2;
    let mut max = 0.0f64;
    for i in 0..shift {
        let (a, b) = (f[i], f[i + shift]);
        max = max.max((a + b).scale(0.5).modulus());
        let tmp = (a - b).scale(0.5);
        f[i] = tmp;
        f[i + shift] = -tmp;
    }
    max
}

/// Hermiticity around the axis midpoint: `f(i) <- (f(i) + conj(f(n-1-i)))/2`
/// and the mirrored entry gets the conjugate. Returns
/// `max_i |(f(i) - conj(f(n-1-i))) / 2|`.
fn frequency_fiber<S: SpScalar>(f: &mut [S]) -> f64 {
    let n = f.len();
    let mut max = 0.0f64;
    for i in 0..n / 2 {
        let j = n - 1 - i;
        let mirrored = f[j].conj();
        max = max.max((f[i] - mirrored).scale(0.5).modulus());
        let tmp = (f[i] + mirrored).scale(0.5);
        f[i] = tmp;
        f[j] = tmp.conj();
    }
    max
}

/// Group average over the cluster orbit of each point, band-blind:
/// `f(p) <- |G|^-1 sum_g f(table[p, 0, g])`.
fn cluster_fiber<S: SpScalar>(f: &mut [S], symmetry: &ClusterSymmetry) -> f64 {
    let n = f.len();
    assert_eq!(
        n,
        symmetry.sites(),
        "the cluster fiber does not match the symmetry table"
    );
    let order = symmetry.group_order();
    let mut f_new = vec![S::zero(); n];
    for element in 0..order {
        for p in 0..n {
            let (p_new, _) = symmetry.op(p, 0, element);
            f_new[p] += f[p_new];
        }
    }
    let norm = 1.0 / order as f64;
    let mut max = 0.0f64;
    for (value, new) in f.iter_mut().zip(f_new) {
        let new = new.scale(norm);
        max = max.max((*value - new).modulus());
        *value = new;
    }
    max
}

fn symmetrize_fiber<S: SpScalar>(
    f: &mut [S],
    domain: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
) -> Result<f64, SymmetrizeError> {
    match domain {
        SpDomain::ImaginaryTime(_) => Ok(time_fiber(f)),
        SpDomain::Matsubara(_)
        | SpDomain::VertexFrequency(_)
        | SpDomain::VertexFrequencyExtended(_) => Ok(frequency_fiber(f)),
        SpDomain::RealFrequency(_) => Ok(0.0),
        SpDomain::RealSpaceCluster(_) | SpDomain::MomentumCluster(_) => {
            let symmetry = symmetry.ok_or(SymmetrizeError::MissingSymmetryTable)?;
            Ok(cluster_fiber(f, symmetry))
        }
        SpDomain::Band(_) | SpDomain::Spin => {
            Err(SymmetrizeError::UnsupportedSignature(vec![domain]))
        }
    }
}

fn write_back<S: SpScalar>(f: &mut ArrayViewMut3<'_, S>, f_new: &Array3<S>) -> f64 {
    let mut max = 0.0f64;
    for (value, new) in f.iter_mut().zip(f_new.iter()) {
        max = max.max((*value - *new).modulus());
        *value = *new;
    }
    max
}

/// Band-resolved anti-periodicity: the mirrored time entry carries swapped
/// band indices.
fn band_time_slice<S: SpScalar>(f: &mut ArrayViewMut3<'_, S>) -> f64 {
    let (nb, _, nt) = f.dim();
    let shift = nt / 2;
    let mut f_new = f.to_owned();
    for t in 0..shift {
        for (b0, b1) in (0..nb).cartesian_product(0..nb) {
            let tmp = (f[[b0, b1, t]] - f[[b1, b0, t + shift]]).scale(0.5);
            f_new[[b0, b1, t]] = tmp;
            f_new[[b1, b0, t + shift]] = -tmp;
        }
    }
    write_back(f, &f_new)
}

/// Band-resolved Hermiticity: the mirrored frequency entry carries swapped
/// band indices and a conjugate.
fn band_frequency_slice<S: SpScalar>(f: &mut ArrayViewMut3<'_, S>) -> f64 {
    let (nb, _, nw) = f.dim();
    let last = nw - 1;
    let mut f_new = f.to_owned();
    for w in 0..nw / 2 {
        for (b0, b1) in (0..nb).cartesian_product(0..nb) {
            let tmp = (f[[b0, b1, w]] + f[[b1, b0, last - w]].conj()).scale(0.5);
            f_new[[b0, b1, w]] = tmp;
            f_new[[b1, b0, last - w]] = tmp.conj();
        }
    }
    write_back(f, &f_new)
}

/// Band-resolved cluster average with permuted bands.
fn band_cluster_slice<S: SpScalar>(
    f: &mut ArrayViewMut3<'_, S>,
    symmetry: &ClusterSymmetry,
    band_mapped_points: bool,
) -> f64 {
    let (nb, _, np) = f.dim();
    assert_eq!(
        np,
        symmetry.sites(),
        "the cluster axis does not match the symmetry table"
    );
    let order = symmetry.group_order();
    let mut f_new = Array3::zeros((nb, nb, np));
    for element in 0..order {
        for (b0, b1) in (0..nb).cartesian_product(0..nb) {
            for p in 0..np {
                // Momentum clusters look the replacement point up on the b0
                // row of the table; real-space clusters always use band row 0.
                let p_new = if band_mapped_points {
                    symmetry.op(p, b0, element).0
                } else {
                    symmetry.op(p, 0, element).0
                };
                let b0_new = symmetry.op(0, b0, element).1;
                let b1_new = symmetry.op(p, b1, element).1;
                f_new[[b0, b1, p]] += f[[b0_new, b1_new, p_new]];
            }
        }
    }
    let norm = 1.0 / order as f64;
    f_new.mapv_inplace(|value: S| value.scale(norm));
    write_back(f, &f_new)
}

fn symmetrize_band_slice<S: SpScalar>(
    f: &mut ArrayViewMut3<'_, S>,
    domain: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
) -> Result<f64, SymmetrizeError> {
    match domain {
        SpDomain::ImaginaryTime(_) => Ok(band_time_slice(f)),
        SpDomain::Matsubara(_)
        | SpDomain::VertexFrequency(_)
        | SpDomain::VertexFrequencyExtended(_) => Ok(band_frequency_slice(f)),
        SpDomain::RealFrequency(_) => Ok(0.0),
        SpDomain::RealSpaceCluster(_) => {
            let symmetry = symmetry.ok_or(SymmetrizeError::MissingSymmetryTable)?;
            Ok(band_cluster_slice(f, symmetry, false))
        }
        SpDomain::MomentumCluster(_) => {
            let symmetry = symmetry.ok_or(SymmetrizeError::MissingSymmetryTable)?;
            Ok(band_cluster_slice(f, symmetry, true))
        }
        SpDomain::Band(_) | SpDomain::Spin => {
            Err(SymmetrizeError::UnsupportedSignature(vec![domain]))
        }
    }
}

fn single_domain<S: SpScalar>(
    f: &mut SpFunction<S>,
    domain: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let name = f.name().to_string();
    let values = f
        .values_mut()
        .as_slice_mut()
        .expect("single-particle functions are stored densely");
    let residual = symmetrize_fiber(values, domain, symmetry)?;
    report_residual(do_diff, residual, domain_label(domain), &name);
    Ok(residual)
}

fn band_pair_single<S: SpScalar>(
    f: &mut SpFunction<S>,
    domain: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let name = f.name().to_string();
    let mut view = f
        .values_mut()
        .view_mut()
        .into_dimensionality::<Ix3>()
        .expect("a band-pair function has three axes");
    let residual = symmetrize_band_slice(&mut view, domain, symmetry)?;
    report_residual(do_diff, residual, domain_label(domain), &name);
    Ok(residual)
}

/// Symmetrize the two trailing domains independently: first every `d0` fiber
/// at fixed `(b0, b1, i1)`, then every `d1` fiber at fixed `(b0, b1, i0)`.
fn band_pair_double<S: SpScalar>(
    f: &mut SpFunction<S>,
    d0: SpDomain,
    d1: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let name = f.name().to_string();
    let shape = f.values().shape().to_vec();
    let (nb, n0, n1) = (shape[0], shape[2], shape[3]);
    let data = f.values_mut();

    let mut residual0 = 0.0f64;
    let mut fiber = vec![S::zero(); n0];
    for (b0, b1) in (0..nb).cartesian_product(0..nb) {
        for i1 in 0..n1 {
            for (i0, value) in fiber.iter_mut().enumerate() {
                *value = data[[b0, b1, i0, i1]];
            }
            residual0 = residual0.max(symmetrize_fiber(&mut fiber, d0, symmetry)?);
            for (i0, value) in fiber.iter().enumerate() {
                data[[b0, b1, i0, i1]] = *value;
            }
        }
    }
    report_residual(do_diff, residual0, domain_label(d0), &name);

    let mut residual1 = 0.0f64;
    let mut fiber = vec![S::zero(); n1];
    for (b0, b1) in (0..nb).cartesian_product(0..nb) {
        for i0 in 0..n0 {
            for (i1, value) in fiber.iter_mut().enumerate() {
                *value = data[[b0, b1, i0, i1]];
            }
            residual1 = residual1.max(symmetrize_fiber(&mut fiber, d1, symmetry)?);
            for (i1, value) in fiber.iter().enumerate() {
                data[[b0, b1, i0, i1]] = *value;
            }
        }
    }
    report_residual(do_diff, residual1, domain_label(d1), &name);

    Ok(residual0.max(residual1))
}

/// Promote the equal-spin blocks of an orbital-spin function to band-pair
/// slices and symmetrize those.
fn orbital_spin_single<S: SpScalar>(
    f: &mut SpFunction<S>,
    domain: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let name = f.name().to_string();
    let shape = f.values().shape().to_vec();
    let (nb, n0) = (shape[0], shape[4]);
    let data = f.values_mut();

    let mut residual = 0.0f64;
    let mut slice = Array3::zeros((nb, nb, n0));
    for spin in 0..2 {
        for (b0, b1) in (0..nb).cartesian_product(0..nb) {
            for i0 in 0..n0 {
                slice[[b0, b1, i0]] = data[[b0, spin, b1, spin, i0]];
            }
        }
        residual = residual.max(symmetrize_band_slice(
            &mut slice.view_mut(),
            domain,
            symmetry,
        )?);
        for (b0, b1) in (0..nb).cartesian_product(0..nb) {
            for i0 in 0..n0 {
                data[[b0, spin, b1, spin, i0]] = slice[[b0, b1, i0]];
            }
        }
    }
    report_residual(do_diff, residual, domain_label(domain), &name);
    Ok(residual)
}

/// Spin symmetrization followed by the two band-pair passes restricted to the
/// equal-spin blocks: off-diagonal spin blocks vanish and the diagonal blocks
/// are equalized before the trailing domains are symmetrized.
fn orbital_spin_double<S: SpScalar>(
    f: &mut SpFunction<S>,
    d0: SpDomain,
    d1: SpDomain,
    symmetry: Option<&ClusterSymmetry>,
    do_diff: bool,
) -> Result<f64, SymmetrizeError> {
    let name = f.name().to_string();
    let shape = f.values().shape().to_vec();
    let (nb, n0, n1) = (shape[0], shape[4], shape[5]);
    let data = f.values_mut();

    for i1 in 0..n1 {
        for i0 in 0..n0 {
            for (b0, b1) in (0..nb).cartesian_product(0..nb) {
                data[[b0, 0, b1, 1, i0, i1]] = S::zero();
                data[[b0, 1, b1, 0, i0, i1]] = S::zero();
                let tmp = (data[[b0, 0, b1, 0, i0, i1]] + data[[b0, 1, b1, 1, i0, i1]]).scale(0.5);
                data[[b0, 0, b1, 0, i0, i1]] = tmp;
                data[[b0, 1, b1, 1, i0, i1]] = tmp;
            }
        }
    }

    let mut residual0 = 0.0f64;
    let mut slice = Array3::zeros((nb, nb, n0));
    for i1 in 0..n1 {
        for spin in 0..2 {
            for (b0, b1) in (0..nb).cartesian_product(0..nb) {
                for i0 in 0..n0 {
                    slice[[b0, b1, i0]] = data[[b0, spin, b1, spin, i0, i1]];
                }
            }
            residual0 = residual0.max(symmetrize_band_slice(&mut slice.view_mut(), d0, symmetry)?);
            for (b0, b1) in (0..nb).cartesian_product(0..nb) {
                for i0 in 0..n0 {
                    data[[b0, spin, b1, spin, i0, i1]] = slice[[b0, b1, i0]];
                }
            }
        }
    }
    report_residual(do_diff, residual0, domain_label(d0), &name);

    let mut residual1 = 0.0f64;
    let mut slice = Array3::zeros((nb, nb, n1));
    for i0 in 0..n0 {
        for spin in 0..2 {
            for (b0, b1) in (0..nb).cartesian_product(0..nb) {
                for i1 in 0..n1 {
                    slice[[b0, b1, i1]] = data[[b0, spin, b1, spin, i0, i1]];
                }
            }
            residual1 = residual1.max(symmetrize_band_slice(&mut slice.view_mut(), d1, symmetry)?);
            for (b0, b1) in (0..nb).cartesian_product(0..nb) {
                for i1 in 0..n1 {
                    data[[b0, spin, b1, spin, i0, i1]] = slice[[b0, b1, i1]];
                }
            }
        }
    }
    report_residual(do_diff, residual1, domain_label(d1), &name);

    Ok(residual0.max(residual1))
}
