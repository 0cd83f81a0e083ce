use rand::distributions::Uniform;
use rand::Rng;
use std::fmt::Debug;
use std::ops::AddAssign;

/// Convert a Vector to a printable string
///
/// # Example
///
/// ```rust
/// # use emix::misc::vec_to_string;
/// let xs: Vec<u8> = vec![0, 1, 2, 3, 4, 5];
///
/// assert_eq!(vec_to_string(&xs, 6).as_str(), "[0, 1, 2, 3, 4, 5]");
/// assert_eq!(vec_to_string(&xs, 5).as_str(), "[0, 1, 2, 3, ... , 5]");
///
/// ```
pub fn vec_to_string<T: Debug>(xs: &[T], max_entries: usize) -> String {
    let mut out = String::new();
    out += "[";
    let n = xs.len();
    xs.iter().enumerate().for_each(|(i, x)| {
        let to_push = if i < max_entries - 1 && i < n - 1 {
            format!("{:?}, ", x)
        } else if i == (max_entries - 1) && n > max_entries {
            String::from("... , ")
        } else if i == n - 1 {
            format!("{:?}]", x)
        } else {
            String::new()
        };

        out.push_str(to_push.as_str());
    });

    if n == 0 {
        out.push(']');
    }

    out
}

/// Cumulative sum of `xs`
///
/// # Example
///
/// ```rust
/// # use emix::misc::cumsum;
/// let xs: Vec<f64> = vec![0.5, 0.25, 0.25];
/// assert_eq!(cumsum(&xs), vec![0.5, 0.75, 1.0]);
/// ```
pub fn cumsum<T>(xs: &[T]) -> Vec<T>
where
    T: AddAssign + Copy + Default,
{
    xs.iter()
        .scan(T::default(), |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Index of the first cumulative weight strictly greater than `r`
#[inline]
fn upper_bound(cws: &[f64], r: f64) -> usize {
    let mut left: usize = 0;
    let mut right: usize = cws.len();
    while left < right {
        let mid = (left + right) / 2;
        if cws[mid] <= r {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    left
}

#[inline]
fn catflip_bisection(cws: &[f64], r: f64) -> Option<usize> {
    let ix = upper_bound(cws, r);
    if ix < cws.len() {
        Some(ix)
    } else {
        None
    }
}

#[inline]
fn catflip_standard(cws: &[f64], r: f64) -> Option<usize> {
    cws.iter().position(|&w| w > r)
}

fn catflip(cws: &[f64], r: f64) -> Option<usize> {
    if cws.len() > 9 {
        catflip_bisection(cws, r)
    } else {
        catflip_standard(cws, r)
    }
}

/// Draw `n` indices in proportion to their `weights`.
///
/// The weights need not be normalized, but they must not all be zero.
///
/// # Example
///
/// ```rust
/// # use emix::misc::pflip;
/// let weights: Vec<f64> = vec![0.4, 0.0, 0.6];
/// let ixs = pflip(&weights, 100, &mut rand::thread_rng());
///
/// assert_eq!(ixs.len(), 100);
/// assert!(ixs.iter().all(|&ix| ix == 0 || ix == 2));
/// ```
pub fn pflip<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Vec<usize> {
    if weights.is_empty() {
        panic!("Empty container");
    }
    let cws: Vec<f64> = cumsum(weights);
    let scale: f64 = cws[cws.len() - 1];
    let u = Uniform::new(0.0, 1.0);

    (0..n)
        .map(|_| {
            let r = rng.sample(u) * scale;
            match catflip(&cws, r) {
                Some(ix) => ix,
                None => {
                    let wsvec = weights.to_vec();
                    panic!("Could not draw from {:?}", wsvec)
                }
            }
        })
        .collect()
}
