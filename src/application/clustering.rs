//! Density-based clustering (DBSCAN) over small feature matrices.
//!
//! Points are visited in input order and clusters are seeded only from core
//! points, so identical input always yields identical labels.

/// Cluster assignment of one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Noise,
    Cluster(usize),
}

impl Label {
    pub fn is_noise(&self) -> bool {
        matches!(self, Label::Noise)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    /// Neighborhood radius, in raw feature units
    pub eps: f64,
    /// Minimum neighborhood size (the point itself included) for a core point
    pub min_pts: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self { eps, min_pts }
    }

    /// Label every point. Memory stays linear in the number of points:
    /// neighbourhoods are recomputed when a point is expanded, only the
    /// core flags are kept.
    pub fn fit<const D: usize>(&self, points: &[[f64; D]]) -> Vec<Label> {
        let n = points.len();

        let core: Vec<bool> = (0..n)
            .map(|i| self.neighbors(points, i).take(self.min_pts).count() >= self.min_pts)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut next_cluster = 0;

        for seed in 0..n {
            if labels[seed].is_some() || !core[seed] {
                continue;
            }

            labels[seed] = Some(next_cluster);
            let mut frontier = vec![seed];

            while let Some(p) = frontier.pop() {
                // Border points join the cluster but do not expand it
                if !core[p] {
                    continue;
                }
                for q in self.neighbors(points, p) {
                    if labels[q].is_none() {
                        labels[q] = Some(next_cluster);
                        frontier.push(q);
                    }
                }
            }

            next_cluster += 1;
        }

        labels
            .into_iter()
            .map(|l| l.map_or(Label::Noise, Label::Cluster))
            .collect()
    }

    /// Indices within `eps` of `points[i]`, the point itself included
    fn neighbors<'a, const D: usize>(
        &self,
        points: &'a [[f64; D]],
        i: usize,
    ) -> impl Iterator<Item = usize> + 'a {
        let eps = self.eps;
        let center = &points[i];
        (0..points.len()).filter(move |&j| distance(center, &points[j]) <= eps)
    }
}

fn distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
