use crate::shared::region::Region;

/// Merges overlapping raw detections into one region per object.
///
/// Candidates are clustered by edge similarity (relative tolerance `eps`),
/// each cluster is replaced by its average rectangle, and clusters with
/// `min_neighbors` or fewer members are discarded. A surviving cluster that
/// lies inside a stronger one is dropped as well.
///
/// With `min_neighbors == 0` the candidates are returned unchanged.
pub fn group_rectangles(candidates: &[Region], min_neighbors: usize, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 || candidates.is_empty() {
        return candidates.to_vec();
    }

    let labels = partition(candidates, |a, b| similar(a, b, eps));
    let class_count = labels.iter().copied().max().map_or(0, |m| m + 1);

    let mut totals = vec![[0i64; 4]; class_count];
    let mut counts = vec![0usize; class_count];
    for (region, &label) in candidates.iter().zip(&labels) {
        let t = &mut totals[label];
        t[0] += region.x as i64;
        t[1] += region.y as i64;
        t[2] += region.width as i64;
        t[3] += region.height as i64;
        counts[label] += 1;
    }

    let averages: Vec<Region> = totals
        .iter()
        .zip(&counts)
        .map(|(t, &n)| {
            let avg = |v: i64| (v as f64 / n as f64).round() as i32;
            Region::new(avg(t[0]), avg(t[1]), avg(t[2]), avg(t[3]))
        })
        .collect();

    (0..class_count)
        .filter(|&i| counts[i] > min_neighbors)
        .filter(|&i| {
            !(0..class_count).any(|j| {
                j != i
                    && counts[j] > min_neighbors
                    && nested(&averages[i], &averages[j], eps)
                    && (counts[j] > counts[i].max(3) || counts[i] < 3)
            })
        })
        .map(|i| averages[i])
        .collect()
}

fn similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: i32, q: i32| ((p - q).abs() as f64) <= delta;
    close(a.x, b.x) && close(a.y, b.y) && close(a.right(), b.right()) && close(a.bottom(), b.bottom())
}

/// Whether `inner` lies within `outer` grown by `eps` of its size.
fn nested(inner: &Region, outer: &Region, eps: f64) -> bool {
    let dx = (outer.width as f64 * eps).round() as i32;
    let dy = (outer.height as f64 * eps).round() as i32;
    inner.x >= outer.x - dx
        && inner.y >= outer.y - dy
        && inner.right() <= outer.right() + dx
        && inner.bottom() <= outer.bottom() + dy
}

/// Labels the transitive closure of `same` as equivalence classes, numbered
/// in order of each class's first member.
fn partition<F>(items: &[Region], same: F) -> Vec<usize>
where
    F: Fn(&Region, &Region) -> bool,
{
    let mut parent: Vec<usize> = (0..items.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..items.len() {
        for j in 0..i {
            if same(&items[i], &items[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Keep the earlier index as root.
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut label_of_root = vec![usize::MAX; items.len()];
    let mut next_label = 0;
    (0..items.len())
        .map(|i| {
            let root = find(&mut parent, i);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next_label;
                next_label += 1;
            }
            label_of_root[root]
        })
        .collect()
}
