/// One run of a character-level edit script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Keep this many characters
    Equal(usize),
    Delete(String),
    Insert(String),
}

impl DiffOp {
    pub fn is_equal(&self) -> bool {
        matches!(self, DiffOp::Equal(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Equal,
    Delete(char),
    Insert(char),
}

/// Minimal edit script turning `old` into `new`, over `char`s.
///
/// The common prefix and suffix are split off first, so a single contiguous insert or
/// delete never reaches the O(ND) search. Adjacent runs are coalesced and, inside each
/// changed hunk, deletes come before inserts.
pub fn diff_chars(old: &str, new: &str) -> Vec<DiffOp> {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let middle_old = &old[prefix..old.len() - suffix];
    let middle_new = &new[prefix..new.len() - suffix];

    let mut steps = vec![Step::Equal; prefix];
    steps.extend(myers(middle_old, middle_new));
    steps.extend(std::iter::repeat_n(Step::Equal, suffix));
    coalesce(&steps)
}

/// Whether `ops` change nothing
pub fn is_identity(ops: &[DiffOp]) -> bool {
    ops.iter().all(DiffOp::is_equal)
}

/// Myers' shortest edit script in linear space: find the middle snake of the
/// remaining box, then recurse into the halves on either side of it
fn myers(a: &[char], b: &[char]) -> Vec<Step> {
    let bound = max_d(a.len(), b.len());
    let mut forward = Frontier::new(bound);
    let mut backward = Frontier::new(bound);
    let mut steps = Vec::with_capacity(a.len() + b.len());
    conquer(a, b, &mut forward, &mut backward, &mut steps);
    steps
}

/// Furthest-reaching x per diagonal `k`, indexed from `-bound`
struct Frontier {
    offset: isize,
    v: Vec<usize>,
}

impl Frontier {
    fn new(bound: usize) -> Self {
        Self {
            offset: bound as isize,
            v: vec![0; 2 * bound + 2],
        }
    }
}

impl std::ops::Index<isize> for Frontier {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl std::ops::IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn max_d(n: usize, m: usize) -> usize {
    (n + m).div_ceil(2) + 1
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn conquer(
    a: &[char],
    b: &[char],
    forward: &mut Frontier,
    backward: &mut Frontier,
    steps: &mut Vec<Step>,
) {
    let prefix = common_prefix(a, b);
    steps.extend(std::iter::repeat_n(Step::Equal, prefix));
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = common_suffix(a, b);
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if a.is_empty() {
        steps.extend(b.iter().map(|c| Step::Insert(*c)));
    } else if b.is_empty() {
        steps.extend(a.iter().map(|c| Step::Delete(*c)));
    } else if let Some((x, y)) = middle_snake(a, b, forward, backward) {
        conquer(&a[..x], &b[..y], forward, backward, steps);
        conquer(&a[x..], &b[y..], forward, backward, steps);
    } else {
        steps.extend(a.iter().map(|c| Step::Delete(*c)));
        steps.extend(b.iter().map(|c| Step::Insert(*c)));
    }

    steps.extend(std::iter::repeat_n(Step::Equal, suffix));
}

/// Split point `(x, y)` on an optimal path through the `a` x `b` edit graph, found by
/// running the forward and reverse searches until their frontiers overlap
fn middle_snake(
    a: &[char],
    b: &[char],
    forward: &mut Frontier,
    backward: &mut Frontier,
) -> Option<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    forward[1] = 0;
    backward[1] = 0;

    for d in 0..max_d(n, m) as isize {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward[k - 1] < forward[k + 1]) {
                forward[k + 1]
            } else {
                forward[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(&a[x..], &b[y..]);
            }
            forward[k] = x;
            if odd && (k - delta).abs() < d && forward[k] + backward[-(k - delta)] >= n {
                return Some((x0, y0));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward[k - 1] < backward[k + 1]) {
                backward[k + 1]
            } else {
                backward[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let run = common_suffix(&a[..n - x], &b[..m - y]);
                x += run;
                y += run;
            }
            backward[k] = x;
            if !odd && (k - delta).abs() <= d && backward[k] + forward[-(k - delta)] >= n {
                return Some((n - x, m - y));
            }
        }
    }
    None
}

fn coalesce(steps: &[Step]) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    let mut equal = 0;
    let mut deleted = String::new();
    let mut inserted = String::new();

    let flush_hunk = |ops: &mut Vec<DiffOp>, deleted: &mut String, inserted: &mut String| {
        if !deleted.is_empty() {
            ops.push(DiffOp::Delete(std::mem::take(deleted)));
        }
        if !inserted.is_empty() {
            ops.push(DiffOp::Insert(std::mem::take(inserted)));
        }
    };

    for step in steps {
        match step {
            Step::Equal => {
                flush_hunk(&mut ops, &mut deleted, &mut inserted);
                equal += 1;
            }
            Step::Delete(c) | Step::Insert(c) => {
                if equal > 0 {
                    ops.push(DiffOp::Equal(equal));
                    equal = 0;
                }
                if matches!(step, Step::Delete(_)) {
                    deleted.push(*c);
                } else {
                    inserted.push(*c);
                }
            }
        }
    }
    flush_hunk(&mut ops, &mut deleted, &mut inserted);
    if equal > 0 {
        ops.push(DiffOp::Equal(equal));
    }
    ops
}
