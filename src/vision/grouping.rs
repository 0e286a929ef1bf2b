//! Merge overlapping candidate windows into detections.

use super::DetectionBox;

/// Two boxes are similar when every edge is within `eps` of the mean smaller side.
fn similar(a: &DetectionBox, b: &DetectionBox, eps: f64) -> bool {
    let (ax, ay, aw, ah) = (a.x as f64, a.y as f64, a.width as f64, a.height as f64);
    let (bx, by, bw, bh) = (b.x as f64, b.y as f64, b.width as f64, b.height as f64);
    let delta = eps * (aw.min(bw) + ah.min(bh)) * 0.5;
    (ax - bx).abs() <= delta
        && (ay - by).abs() <= delta
        && (ax + aw - bx - bw).abs() <= delta
        && (ay + ah - by - bh).abs() <= delta
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Cluster similar boxes, average each cluster, and keep clusters with more than `min_neighbors`
/// members. Small clusters lying inside a better-supported one are dropped.
/// With `min_neighbors == 0` the input is returned unchanged.
///
/// Output order follows each cluster's first member in `rects`.
pub fn group_rectangles(rects: &[DetectionBox], min_neighbors: usize, eps: f64) -> Vec<DetectionBox> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let n = rects.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    // Cluster label per root, numbered in first-seen order.
    let mut label_of_root = vec![usize::MAX; n];
    let mut sums: Vec<[u64; 4]> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (i, r) in rects.iter().enumerate() {
        let root = find(&mut parent, i);
        if label_of_root[root] == usize::MAX {
            label_of_root[root] = sums.len();
            sums.push([0; 4]);
            counts.push(0);
        }
        let l = label_of_root[root];
        sums[l][0] += r.x as u64;
        sums[l][1] += r.y as u64;
        sums[l][2] += r.width as u64;
        sums[l][3] += r.height as u64;
        counts[l] += 1;
    }

    let averaged: Vec<DetectionBox> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| {
            let avg = |v: u64| (v as f64 / c as f64).round() as u32;
            DetectionBox::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut out = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i64;
            let dy = (r2.height as f64 * eps).round() as i64;
            let (x1, y1, w1, h1) = (r1.x as i64, r1.y as i64, r1.width as i64, r1.height as i64);
            let (x2, y2, w2, h2) = (r2.x as i64, r2.y as i64, r2.width as i64, r2.height as i64);
            x1 >= x2 - dx
                && y1 >= y2 - dy
                && x1 + w1 <= x2 + w2 + dx
                && y1 + h1 <= y2 + h2 + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            out.push(*r1);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x: u32, y: u32, w: u32, h: u32) -> DetectionBox {
        DetectionBox::new(x, y, w, h)
    }

    #[test]
    fn zero_neighbors_passes_through() {
        let rects = vec![b(0, 0, 10, 10), b(50, 50, 10, 10)];
        assert_eq!(group_rectangles(&rects, 0, 0.2), rects);
    }

    #[test]
    fn cluster_is_averaged() {
        let rects = vec![
            b(100, 100, 40, 40),
            b(102, 100, 40, 40),
            b(101, 102, 42, 42),
            b(104, 101, 40, 40),
        ];
        let out = group_rectangles(&rects, 3, 0.2);
        assert_eq!(out, vec![b(102, 101, 41, 41)]);
    }

    #[test]
    fn sparse_clusters_are_dropped() {
        let rects = vec![
            b(0, 0, 30, 30),
            b(1, 1, 30, 30),
            b(300, 300, 30, 30),
            b(301, 300, 30, 30),
            b(300, 301, 30, 30),
            b(302, 302, 30, 30),
        ];
        let out = group_rectangles(&rects, 2, 0.2);
        assert_eq!(out.len(), 1);
        assert!(out[0].x >= 300);
    }

    #[test]
    fn small_cluster_inside_strong_one_is_dropped() {
        let mut rects = Vec::new();
        for i in 0..8 {
            rects.push(b(100 + i % 2, 100, 100, 100));
        }
        for i in 0..2 {
            rects.push(b(140 + i, 140, 20, 20));
        }
        let out = group_rectangles(&rects, 1, 0.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].width, 100);
    }
}
