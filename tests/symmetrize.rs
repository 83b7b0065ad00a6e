use approx::assert_relative_eq;
use cluster_qmc::symmetrize::{
    symmetrize_single_particle, ClusterSymmetry, SpDomain, SpFunction, SYMMETRY_TOLERANCE,
};
use num_complex::Complex64;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_values(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0, 1.0)).collect()
}

fn random_complex_values(n: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Complex64::new(rng.gen_range(-1.0, 1.0), rng.gen_range(-1.0, 1.0)))
        .collect()
}

/// Reflection group {e, p -> (n - p) % n} of a one-dimensional ring, acting
/// trivially on bands.
fn ring_reflection(sites: usize, bands: usize) -> ClusterSymmetry {
    let entries = (0..sites)
        .flat_map(|site| {
            (0..bands).flat_map(move |band| vec![(site, band), ((sites - site) % sites, band)])
        })
        .collect();
    ClusterSymmetry::new(sites, bands, 2, entries).unwrap()
}

#[test]
fn orbital_spin_function_gains_all_symmetries() {
    let nb = 2;
    let nk = 4;
    let nw = 6;
    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Spin,
        SpDomain::Band(nb),
        SpDomain::Spin,
        SpDomain::MomentumCluster(nk),
        SpDomain::Matsubara(nw),
    ];
    let volume = nb * 2 * nb * 2 * nk * nw;
    let mut f = SpFunction::from_values(
        "G_k_w",
        domains,
        random_complex_values(volume, 0xfeed),
    )
    .unwrap();

    let symmetry = ring_reflection(nk, nb);
    symmetrize_single_particle(&mut f, Some(&symmetry), false).unwrap();

    for b0 in 0..nb {
        for b1 in 0..nb {
            for k in 0..nk {
                for w in 0..nw {
                    // Off-diagonal spin blocks vanish, diagonal blocks agree.
                    assert_eq!(f.get(&[b0, 0, b1, 1, k, w]), Complex64::new(0.0, 0.0));
                    assert_eq!(f.get(&[b0, 1, b1, 0, k, w]), Complex64::new(0.0, 0.0));
                    let up = f.get(&[b0, 0, b1, 0, k, w]);
                    let down = f.get(&[b0, 1, b1, 1, k, w]);
                    assert_relative_eq!(up.re, down.re, epsilon = 1e-12);
                    assert_relative_eq!(up.im, down.im, epsilon = 1e-12);

                    // Hermiticity in the Matsubara mirror with swapped bands.
                    let mirrored = f.get(&[b1, 0, b0, 0, k, nw - 1 - w]).conj();
                    assert_relative_eq!(up.re, mirrored.re, epsilon = 1e-12);
                    assert_relative_eq!(up.im, mirrored.im, epsilon = 1e-12);
                }
            }
        }
    }

    // Idempotence: a second application changes nothing measurable.
    let once: Vec<Complex64> = f.values().iter().cloned().collect();
    let residual = symmetrize_single_particle(&mut f, Some(&symmetry), true).unwrap();
    assert!(residual < SYMMETRY_TOLERANCE);
    for (a, b) in once.iter().zip(f.values().iter()) {
        assert!((a - b).norm() < SYMMETRY_TOLERANCE);
    }
}

#[test]
fn orbital_spin_time_function() {
    let nb = 1;
    let nt = 8;
    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Spin,
        SpDomain::Band(nb),
        SpDomain::Spin,
        SpDomain::ImaginaryTime(nt),
    ];
    let mut f =
        SpFunction::from_values("G_t", domains, random_values(2 * 2 * nt, 0xbeef)).unwrap();
    symmetrize_single_particle(&mut f, None, false).unwrap();

    // Equal-spin blocks become anti-periodic over half the time axis. The
    // three-domain orbital-spin form does not touch the spin structure.
    for spin in 0..2 {
        for t in 0..nt / 2 {
            let value = f.get(&[0, spin, 0, spin, t]);
            let shifted = f.get(&[0, spin, 0, spin, t + nt / 2]);
            assert_relative_eq!(value, -shifted, epsilon = 1e-12);
        }
    }
}

#[test]
fn band_pair_cluster_average_respects_band_permutations() {
    let nb = 2;
    let nr = 4;
    let symmetry = ring_reflection(nr, nb);
    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Band(nb),
        SpDomain::RealSpaceCluster(nr),
    ];
    let mut f =
        SpFunction::from_values("G_r", domains, random_values(nb * nb * nr, 0xabba)).unwrap();
    symmetrize_single_particle(&mut f, Some(&symmetry), false).unwrap();

    // With band-trivial group elements the orbit average reduces to
    // f(b0, b1, r) == f(b0, b1, S(r)).
    for b0 in 0..nb {
        for b1 in 0..nb {
            for r in 0..nr {
                let image = f.get(&[b0, b1, (nr - r) % nr]);
                assert_relative_eq!(f.get(&[b0, b1, r]), image, epsilon = 1e-12);
            }
        }
    }

    let residual = symmetrize_single_particle(&mut f, Some(&symmetry), false).unwrap();
    assert!(residual < SYMMETRY_TOLERANCE);
}

#[test]
fn band_pair_double_pass_symmetrizes_both_axes() {
    let nb = 2;
    let nt = 4;
    let nw = 4;
    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Band(nb),
        SpDomain::ImaginaryTime(nt),
        SpDomain::Matsubara(nw),
    ];
    let mut f = SpFunction::from_values(
        "G_t_w",
        domains,
        random_complex_values(nb * nb * nt * nw, 0x1234),
    )
    .unwrap();
    symmetrize_single_particle(&mut f, None, false).unwrap();

    // Fiber passes apply the scalar rules at fixed band pair.
    for b0 in 0..nb {
        for b1 in 0..nb {
            for w in 0..nw {
                for t in 0..nt / 2 {
                    let value = f.get(&[b0, b1, t, w]);
                    let shifted = f.get(&[b0, b1, t + nt / 2, w]);
                    assert!((value + shifted).norm() < 1e-12);
                }
            }
        }
    }

    let residual = symmetrize_single_particle(&mut f, None, false).unwrap();
    assert!(residual < SYMMETRY_TOLERANCE);
}

#[test]
fn vertex_frequency_windows_follow_the_matsubara_rule() {
    for domain in [
        SpDomain::VertexFrequency(6),
        SpDomain::VertexFrequencyExtended(6),
    ] {
        let mut f =
            SpFunction::from_values("G4_w", vec![domain], random_complex_values(6, 0x77)).unwrap();
        symmetrize_single_particle(&mut f, None, false).unwrap();
        for i in 0..6 {
            let mirrored = f.get(&[5 - i]).conj();
            assert!((f.get(&[i]) - mirrored).norm() < 1e-12);
        }
    }
}

#[test]
fn momentum_band_lookup_uses_b0_row() {
    // A single table element that moves momenta only on band row 1. The
    // momentum path reads the replacement index from the b0 row, so the
    // b0 = 1 slices are permuted while b0 = 0 slices stay in place.
    let nb = 2;
    let nk = 2;
    let entries = vec![
        // site 0: band rows 0 and 1
        (0, 0),
        (1, 1),
        // site 1: band rows 0 and 1
        (1, 0),
        (0, 1),
    ];
    let symmetry = ClusterSymmetry::new(nk, nb, 1, entries).unwrap();

    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Band(nb),
        SpDomain::MomentumCluster(nk),
    ];
    let values: Vec<f64> = (0..nb * nb * nk).map(|v| v as f64).collect();
    let mut f = SpFunction::from_values("G_k", domains.clone(), values.clone()).unwrap();
    symmetrize_single_particle(&mut f, Some(&symmetry), false).unwrap();

    for b1 in 0..nb {
        for k in 0..nk {
            // b0 = 0 reads from the untouched band row.
            assert_eq!(f.get(&[0, b1, k]), values[b1 * nk + k]);
            // b0 = 1 reads through the permuted row of the table.
            assert_eq!(f.get(&[1, b1, k]), values[nk * nb + b1 * nk + (1 - k)]);
        }
    }

    // The real-space path with the same table ignores the band-1 row.
    let domains = vec![
        SpDomain::Band(nb),
        SpDomain::Band(nb),
        SpDomain::RealSpaceCluster(nk),
    ];
    let mut f = SpFunction::from_values("G_r", domains, values.clone()).unwrap();
    symmetrize_single_particle(&mut f, Some(&symmetry), false).unwrap();
    assert_eq!(
        f.values().as_slice().unwrap(),
        values.as_slice(),
        "band row 0 is the identity, so nothing moves"
    );
}
