use std::collections::BTreeMap;


/// Sentinel value for a zone target meaning "leave this zone unscaled".
pub static NO_ZONE_TARGET: f64 = -1.0;

/// An origin-destination demand matrix.
///
/// Volumes are keyed by (origin node key, destination node key). The margin
/// sums are *not* kept up to date automatically: any code that mutates
/// `volume` must call `set_margin_sums` before the sums are read again.
///
/// Ordered maps are used throughout so that iteration over the matrix (and
/// anything derived from it, like the least-squares variable ordering) is
/// reproducible from run to run.
#[derive(Debug, Clone)]
pub struct OdMatrix {
    /// OD volume per zone pair.
    pub volume: BTreeMap<(usize, usize), f64>,
    /// Node keys of the origin zones.
    pub origins: Vec<usize>,
    /// Node keys of the destination zones.
    pub destinations: Vec<usize>,
    /// Display names of the origin zones, parallel to `origins`.
    pub names_o: Vec<String>,
    /// Display names of the destination zones, parallel to `destinations`.
    pub names_d: Vec<String>,
    /// Per-zone origin total targets. `NO_ZONE_TARGET` means "do not scale".
    pub targets_o: BTreeMap<usize, f64>,
    /// Per-zone destination total targets.
    pub targets_d: BTreeMap<usize, f64>,
    /// Row sums of `volume` per origin zone.
    pub sums_o: BTreeMap<usize, f64>,
    /// Column sums of `volume` per destination zone.
    pub sums_d: BTreeMap<usize, f64>,
}

impl OdMatrix {
    pub fn new(volume: BTreeMap<(usize, usize), f64>,
               origins: Vec<usize>,
               destinations: Vec<usize>,
               names_o: Vec<String>,
               names_d: Vec<String>,
               targets_o: BTreeMap<usize, f64>,
               targets_d: BTreeMap<usize, f64>) -> OdMatrix {
        let mut od = OdMatrix {
            volume,
            origins,
            destinations,
            names_o,
            names_d,
            targets_o,
            targets_d,
            sums_o: BTreeMap::new(),
            sums_d: BTreeMap::new(),
        };
        od.set_margin_sums();
        return od;
    }

    /// Create a matrix sharing the source's zone universe.
    ///
    /// Volumes and targets are deep-copied when the corresponding flag is
    /// set, and zero-filled otherwise.
    pub fn from_source(source: &OdMatrix, copy_volume: bool, copy_targets: bool) -> OdMatrix {
        let volume = if copy_volume {
            source.volume.clone()
        } else {
            source.volume.keys().map(|kk| (*kk, 0.)).collect()
        };

        let (targets_o, targets_d) = if copy_targets {
            (source.targets_o.clone(), source.targets_d.clone())
        } else {
            (source.targets_o.keys().map(|kk| (*kk, 0.)).collect(),
             source.targets_d.keys().map(|kk| (*kk, 0.)).collect())
        };

        OdMatrix::new(volume,
                      source.origins.clone(),
                      source.destinations.clone(),
                      source.names_o.clone(),
                      source.names_d.clone(),
                      targets_o,
                      targets_d)
    }

    /// Recompute the origin and destination margin sums from the volumes.
    pub fn set_margin_sums(&mut self) {
        self.sums_o = self.origins.iter().map(|oo| (*oo, 0.)).collect();
        self.sums_d = self.destinations.iter().map(|dd| (*dd, 0.)).collect();

        for ((oo, dd), vv) in &self.volume {
            *self.sums_o.entry(*oo).or_insert(0.) += vv;
            *self.sums_d.entry(*dd).or_insert(0.) += vv;
        }
    }

    /// Cell-wise difference `self - other`, over self's zone pairs. Zone
    /// targets are not carried over.
    pub fn diff(&self, other: &OdMatrix) -> OdMatrix {
        let mut result = OdMatrix::from_source(self, false, false);
        for (kk, vv) in &self.volume {
            let other_vv = other.volume.get(kk).copied().unwrap_or(0.);
            result.volume.insert(*kk, vv - other_vv);
        }
        result.set_margin_sums();
        return result;
    }
}
