//! Piecewise-linear interpolation over scattered 2-D samples.
//!
//! Samples are triangulated with Bowyer-Watson; a query is answered with the
//! barycentric blend of the enclosing triangle's values. Queries outside the
//! convex hull of the samples yield `NaN`.

use nalgebra as na;

/// Squared distance under which two samples are treated as one.
const DUPLICATE_EPS2: f64 = 1e-18;
/// Barycentric slack for points on a triangle edge.
const BARY_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    center: na::Vector2<f64>,
    radius2: f64,
}

impl Triangle {
    fn new(pts: &[na::Vector2<f64>], v: [usize; 3]) -> Option<Triangle> {
        let (a, b, c) = (pts[v[0]], pts[v[1]], pts[v[2]]);
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < f64::EPSILON {
            return None;
        }
        let a2 = a.norm_squared();
        let b2 = b.norm_squared();
        let c2 = c.norm_squared();
        let center = na::Vector2::new(
            (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
            (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
        );
        Some(Triangle {
            v,
            center,
            radius2: (a - center).norm_squared(),
        })
    }

    fn circumcircle_contains(&self, p: &na::Vector2<f64>) -> bool {
        (p - self.center).norm_squared() < self.radius2
    }
}

/// Delaunay triangulation of a point set, as vertex index triples.
pub fn delaunay(points: &[na::Vector2<f64>]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }
    let (mut min, mut max) = (points[0], points[0]);
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    let span = (max - min).max().max(1.0);
    let mid = (min + max) * 0.5;

    // three far vertices enclosing every sample
    let mut pts = points.to_vec();
    let s = pts.len();
    pts.push(mid + na::Vector2::new(-100.0 * span, -100.0 * span));
    pts.push(mid + na::Vector2::new(100.0 * span, -100.0 * span));
    pts.push(mid + na::Vector2::new(0.0, 100.0 * span));

    let Some(root) = Triangle::new(&pts, [s, s + 1, s + 2]) else {
        return Vec::new();
    };
    let mut triangles = vec![root];

    for (idx, p) in points.iter().enumerate() {
        if points[..idx]
            .iter()
            .any(|q| (q - p).norm_squared() < DUPLICATE_EPS2)
        {
            log::trace!("skipping duplicate sample {:?}", p);
            continue;
        }
        let (bad, good): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.circumcircle_contains(p));
        triangles = good;

        // cavity boundary = edges owned by exactly one bad triangle
        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(bad.len() * 3);
        for t in &bad {
            for e in [(t.v[0], t.v[1]), (t.v[1], t.v[2]), (t.v[2], t.v[0])] {
                if let Some(pos) = edges
                    .iter()
                    .position(|o| (o.0 == e.1 && o.1 == e.0) || *o == e)
                {
                    edges.swap_remove(pos);
                } else {
                    edges.push(e);
                }
            }
        }
        for (a, b) in edges {
            if let Some(t) = Triangle::new(&pts, [a, b, idx]) {
                triangles.push(t);
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&v| v < s))
        .map(|t| t.v)
        .collect()
}

/// Uniform bucket grid over the sample bounds. Each cell lists the triangles
/// whose bounding box overlaps it, in triangulation order.
#[derive(Debug, Clone)]
struct TriangleGrid {
    origin: na::Vector2<f64>,
    cell_size: na::Vector2<f64>,
    n: usize,
    cells: Vec<Vec<usize>>,
}

impl TriangleGrid {
    fn new(
        points: &[na::Vector2<f64>],
        triangles: &[[usize; 3]],
        bounds: &(na::Vector2<f64>, na::Vector2<f64>),
    ) -> TriangleGrid {
        let (min, max) = bounds;
        let n = ((triangles.len() as f64).sqrt().ceil() as usize).max(1);
        let cell_size = ((max - min) / n as f64).map(|v| if v > 0.0 { v } else { 1.0 });
        let mut grid = TriangleGrid {
            origin: *min,
            cell_size,
            n,
            cells: vec![Vec::new(); n * n],
        };
        let slack = cell_size * 1e-6;
        for (t, tri) in triangles.iter().enumerate() {
            let (a, b, c) = (points[tri[0]], points[tri[1]], points[tri[2]]);
            let (lo, hi) = (a.inf(&b).inf(&c) - slack, a.sup(&b).sup(&c) + slack);
            let (x0, y0) = grid.cell_of(&lo);
            let (x1, y1) = grid.cell_of(&hi);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    grid.cells[y * n + x].push(t);
                }
            }
        }
        grid
    }

    fn cell_of(&self, p: &na::Vector2<f64>) -> (usize, usize) {
        let last = (self.n - 1) as f64;
        let rel = (p - self.origin).component_div(&self.cell_size);
        (
            rel.x.floor().clamp(0.0, last) as usize,
            rel.y.floor().clamp(0.0, last) as usize,
        )
    }

    fn candidates(&self, p: &na::Vector2<f64>) -> &[usize] {
        let (x, y) = self.cell_of(p);
        &self.cells[y * self.n + x]
    }
}

/// Linear interpolant from 2-D sample locations to 3-D values.
pub struct LinearInterpolator {
    points: Vec<na::Vector2<f64>>,
    values: Vec<na::Vector3<f64>>,
    triangles: Vec<[usize; 3]>,
    bounds: (na::Vector2<f64>, na::Vector2<f64>),
    grid: TriangleGrid,
}

impl LinearInterpolator {
    /// `None` when the samples do not span any triangle (fewer than three, or
    /// all collinear).
    pub fn new(
        points: &[na::Vector2<f64>],
        values: &[na::Vector3<f64>],
    ) -> Option<LinearInterpolator> {
        if points.len() != values.len() || points.len() < 3 {
            return None;
        }
        let triangles = delaunay(points);
        if triangles.is_empty() {
            return None;
        }
        let (mut min, mut max) = (points[0], points[0]);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        let bounds = (min, max);
        let grid = TriangleGrid::new(points, &triangles, &bounds);
        log::trace!(
            "{} triangles in a {}x{} lookup grid",
            triangles.len(),
            grid.n,
            grid.n
        );
        Some(LinearInterpolator {
            points: points.to_vec(),
            values: values.to_vec(),
            triangles,
            bounds,
            grid,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn barycentric(&self, tri: &[usize; 3], p: &na::Vector2<f64>) -> Option<[f64; 3]> {
        let (a, b, c) = (self.points[tri[0]], self.points[tri[1]], self.points[tri[2]]);
        let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let l0 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
        let l1 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
        let l2 = 1.0 - l0 - l1;
        if l0 >= -BARY_EPS && l1 >= -BARY_EPS && l2 >= -BARY_EPS {
            Some([l0, l1, l2])
        } else {
            None
        }
    }

    pub fn interpolate(&self, p: &na::Vector2<f64>) -> na::Vector3<f64> {
        let nan = na::Vector3::repeat(f64::NAN);
        let (min, max) = &self.bounds;
        if !p.x.is_finite() || !p.y.is_finite() || p.x < min.x || p.y < min.y || p.x > max.x || p.y > max.y {
            return nan;
        }
        for &t in self.grid.candidates(p) {
            let tri = &self.triangles[t];
            if let Some(w) = self.barycentric(tri, p) {
                return self.values[tri[0]] * w[0]
                    + self.values[tri[1]] * w[1]
                    + self.values[tri[2]] * w[2];
            }
        }
        nan
    }
}
