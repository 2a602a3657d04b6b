use crate::shared::detection_rect::DetectionRect;

/// Merges overlapping raw detections into one rectangle per face.
///
/// Rectangles are partitioned into clusters of mutually similar boxes
/// (edges within `eps` of their mean size, transitively), each cluster is
/// averaged, and clusters with `group_threshold` or fewer members are
/// dropped. A small cluster lying inside a stronger one is dropped as well.
/// With `group_threshold <= 0` the input is returned unchanged.
pub fn group_rectangles(
    rects: &[DetectionRect],
    group_threshold: i32,
    eps: f64,
) -> Vec<DetectionRect> {
    if group_threshold <= 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, class_count) = partition(rects, eps);

    let mut totals = vec![[0i64; 4]; class_count];
    let mut counts = vec![0i32; class_count];
    for (rect, &label) in rects.iter().zip(&labels) {
        let t = &mut totals[label];
        t[0] += rect.x as i64;
        t[1] += rect.y as i64;
        t[2] += rect.width as i64;
        t[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<DetectionRect> = totals
        .iter()
        .zip(&counts)
        .map(|(t, &n)| {
            let s = 1.0 / n as f64;
            DetectionRect::new(
                (t[0] as f64 * s).round() as i32,
                (t[1] as f64 * s).round() as i32,
                (t[2] as f64 * s).round() as i32,
                (t[3] as f64 * s).round() as i32,
            )
        })
        .collect();

    averaged
        .iter()
        .zip(&counts)
        .enumerate()
        .filter(|&(_, (_, &n1))| n1 > group_threshold)
        .filter(|&(i, (r1, &n1))| {
            !averaged.iter().zip(&counts).enumerate().any(|(j, (r2, &n2))| {
                j != i
                    && n2 > group_threshold
                    && is_nested(r1, r2, eps)
                    && (n2 > n1.max(3) || n1 < 3)
            })
        })
        .map(|(_, (r, _))| *r)
        .collect()
}

/// Whether `inner` lies inside `outer` grown by `eps` of its size.
fn is_nested(inner: &DetectionRect, outer: &DetectionRect, eps: f64) -> bool {
    let dx = (outer.width as f64 * eps).round() as i32;
    let dy = (outer.height as f64 * eps).round() as i32;
    inner.x >= outer.x - dx
        && inner.y >= outer.y - dy
        && inner.right() <= outer.right() + dx
        && inner.bottom() <= outer.bottom() + dy
}

pub(crate) fn similar(a: &DetectionRect, b: &DetectionRect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: i32, q: i32| ((p - q).abs() as f64) <= delta;
    close(a.x, b.x) && close(a.y, b.y) && close(a.right(), b.right()) && close(a.bottom(), b.bottom())
}

/// Labels each rectangle with its equivalence class, numbered in order of
/// first appearance.
fn partition(rects: &[DetectionRect], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut class_count = 0;
    let labels = (0..rects.len())
        .map(|i| {
            let root = find(&mut parent, i);
            if class_of_root[root] == usize::MAX {
                class_of_root[root] = class_count;
                class_count += 1;
            }
            class_of_root[root]
        })
        .collect();
    (labels, class_count)
}
