use crate::symmetrize::{SpScalar, SymmetrizeError};
use ndarray::{Array3, ArrayD, IxDyn};

/// Named axis of a single-particle function, with its size. Spin always has
/// size two; the time and frequency domains are even-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpDomain {
    /// Imaginary time, periodic over half the axis.
    ImaginaryTime(usize),
    /// Matsubara frequency, mirrored around the axis midpoint.
    Matsubara(usize),
    /// Compact vertex frequency window.
    VertexFrequency(usize),
    /// Extended vertex frequency window.
    VertexFrequencyExtended(usize),
    /// Real frequency; symmetrization leaves it untouched.
    RealFrequency(usize),
    /// Electron band.
    Band(usize),
    /// Electron spin.
    Spin,
    /// Real-space cluster sites.
    RealSpaceCluster(usize),
    /// Momentum-space cluster points.
    MomentumCluster(usize),
}

impl SpDomain {
    /// Number of points in this domain.
    pub fn size(self) -> usize {
        match self {
            SpDomain::ImaginaryTime(n)
            | SpDomain::Matsubara(n)
            | SpDomain::VertexFrequency(n)
            | SpDomain::VertexFrequencyExtended(n)
            | SpDomain::RealFrequency(n)
            | SpDomain::Band(n)
            | SpDomain::RealSpaceCluster(n)
            | SpDomain::MomentumCluster(n) => n,
            SpDomain::Spin => 2,
        }
    }
}

/// A function valued over a Cartesian product of named domains. Values are
/// stored densely with the first domain outermost.
#[derive(Debug, Clone)]
pub struct SpFunction<S> {
    name: String,
    domains: Vec<SpDomain>,
    data: ArrayD<S>,
}

impl<S: SpScalar> SpFunction<S> {
    /// A zero-filled function over the given domain product.
    pub fn new<N: Into<String>>(name: N, domains: Vec<SpDomain>) -> Self {
        let shape: Vec<usize> = domains.iter().map(|d| d.size()).collect();
        Self {
            name: name.into(),
            domains,
            data: ArrayD::zeros(IxDyn(&shape)),
        }
    }

    /// Build a function from flattened values, first domain outermost. The
    /// value count must equal the product of the domain sizes.
    pub fn from_values<N: Into<String>>(
        name: N,
        domains: Vec<SpDomain>,
        values: Vec<S>,
    ) -> Result<Self, SymmetrizeError> {
        let shape: Vec<usize> = domains.iter().map(|d| d.size()).collect();
        let expected = shape.iter().product::<usize>();
        if values.len() != expected {
            return Err(SymmetrizeError::ShapeMismatch {
                len: values.len(),
                expected,
            });
        }
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .expect("the length was checked against the shape");
        Ok(Self {
            name: name.into(),
            domains,
            data,
        })
    }

    /// The function's name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The domain product, in storage order.
    pub fn domains(&self) -> &[SpDomain] {
        &self.domains
    }

    /// Value at a full multi-index.
    pub fn get(&self, index: &[usize]) -> S {
        self.data[IxDyn(index)]
    }

    /// Overwrite the value at a full multi-index.
    pub fn set(&mut self, index: &[usize], value: S) {
        self.data[IxDyn(index)] = value;
    }

    /// The dense storage.
    pub fn values(&self) -> &ArrayD<S> {
        &self.data
    }

    /// The dense storage, mutably. The shape must not be changed.
    pub fn values_mut(&mut self) -> &mut ArrayD<S> {
        &mut self.data
    }
}

/// Precomputed action of the cluster point group: entry `(p, b, g)` is the
/// image `(p', b')` of site-or-momentum index `p` and band `b` under the
/// `g`-th group element.
#[derive(Debug, Clone)]
pub struct ClusterSymmetry {
    sites: usize,
    bands: usize,
    group_order: usize,
    table: Array3<(usize, usize)>,
}

impl ClusterSymmetry {
    /// Build a symmetry table from entries listed with the group element
    /// innermost, then bands, then sites. The group must be non-empty and
    /// every image must stay in range.
    pub fn new(
        sites: usize,
        bands: usize,
        group_order: usize,
        entries: Vec<(usize, usize)>,
    ) -> Result<Self, SymmetrizeError> {
        if group_order == 0 {
            return Err(SymmetrizeError::EmptySymmetryGroup);
        }
        let expected = sites * bands * group_order;
        if entries.len() != expected {
            return Err(SymmetrizeError::ShapeMismatch {
                len: entries.len(),
                expected,
            });
        }
        for &(site, band) in &entries {
            if site >= sites || band >= bands {
                return Err(SymmetrizeError::InvalidTableEntry { site, band });
            }
        }
        let table = Array3::from_shape_vec((sites, bands, group_order), entries)
            .expect("the length was checked against the shape");
        Ok(Self {
            sites,
            bands,
            group_order,
            table,
        })
    }

    /// The trivial group acting on the given cluster.
    pub fn identity(sites: usize, bands: usize) -> Self {
        let entries = (0..sites)
            .flat_map(|site| (0..bands).map(move |band| (site, band)))
            .collect();
        Self::new(sites, bands, 1, entries).expect("the identity table is well formed")
    }

    /// Number of cluster sites (or momenta).
    pub fn sites(&self) -> usize {
        self.sites
    }

    /// Number of bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Order of the point group.
    pub fn group_order(&self) -> usize {
        self.group_order
    }

    /// Image of `(site, band)` under group element `element`.
    pub fn op(&self, site: usize, band: usize, element: usize) -> (usize, usize) {
        self.table[[site, band, element]]
    }
}

#[cfg(test)]
mod domains_tests {
    use super::*;

    #[test]
    fn domain_sizes() {
        assert_eq!(SpDomain::Spin.size(), 2);
        assert_eq!(SpDomain::ImaginaryTime(16).size(), 16);
        assert_eq!(SpDomain::Band(3).size(), 3);
    }

    #[test]
    fn function_shape_and_addressing() {
        let mut f = SpFunction::<f64>::new(
            "g",
            vec![SpDomain::Band(2), SpDomain::Band(2), SpDomain::Matsubara(4)],
        );
        f.set(&[1, 0, 3], 2.5);
        assert_eq!(f.get(&[1, 0, 3]), 2.5);
        assert_eq!(f.get(&[0, 0, 0]), 0.0);
        assert_eq!(f.values().len(), 16);
    }

    #[test]
    fn from_values_checks_the_volume() {
        let err = SpFunction::<f64>::from_values("g", vec![SpDomain::ImaginaryTime(4)], vec![0.0]);
        assert!(matches!(
            err,
            Err(SymmetrizeError::ShapeMismatch {
                len: 1,
                expected: 4
            })
        ));
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(matches!(
            ClusterSymmetry::new(2, 1, 0, vec![]),
            Err(SymmetrizeError::EmptySymmetryGroup)
        ));
    }

    #[test]
    fn identity_table() {
        let sym = ClusterSymmetry::identity(3, 2);
        assert_eq!(sym.group_order(), 1);
        for site in 0..3 {
            for band in 0..2 {
                assert_eq!(sym.op(site, band, 0), (site, band));
            }
        }
    }

    #[test]
    fn out_of_range_entries_are_rejected() {
        let err = ClusterSymmetry::new(1, 1, 1, vec![(1, 0)]);
        assert!(matches!(
            err,
            Err(SymmetrizeError::InvalidTableEntry { site: 1, band: 0 })
        ));
    }
}
