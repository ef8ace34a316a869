//! 曲线离散化：bulge 圆弧、圆弧、圆、椭圆与样条统一转换为折线。
//!
//! 采样数为固定常量，同一输入总是得到完全相同的点序列。

use std::f64::consts::TAU;

use glam::DVec2;
use plancad_core::geometry::{Point2, Vector2};

/// bulge 圆弧段的采样点数（含两端点）。
pub const BULGE_ARC_POINTS: usize = 12;
pub const ARC_POINTS: usize = 12;
/// 整圆的分段数；输出点数为分段数加一（首点重复以闭合）。
pub const CIRCLE_SEGMENTS: usize = 32;
pub const ELLIPSE_POINTS: usize = 12;
pub const SPLINE_POINTS: usize = 12;

const ZERO_EPSILON: f64 = 1e-12;

/// 把带 bulge 的多段线段离散为折线。
///
/// bulge 为正时逆时针扫过，为负时顺时针；bulge 为零只返回两端点，
/// 弦长为零只返回起点。
pub fn bulge_arc(start: Point2, end: Point2, bulge: f64) -> Vec<Point2> {
    let chord = end.as_vec2() - start.as_vec2();
    let chord_length = chord.length();
    if chord_length <= ZERO_EPSILON {
        return vec![start];
    }
    if bulge.abs() <= ZERO_EPSILON {
        return vec![start, end];
    }

    // 带符号的圆心角与半径：顺时针时二者同为负值，圆心自动落在弦的另一侧
    let sweep = 4.0 * bulge.atan();
    let half = sweep * 0.5;
    let radius = chord_length / (2.0 * half.sin());
    let normal = chord.perp() / chord_length;
    let midpoint = (start.as_vec2() + end.as_vec2()) * 0.5;
    let center = midpoint + normal * (radius * half.cos());

    let offset = start.as_vec2() - center;
    let start_angle = offset.y.atan2(offset.x);
    let mut points = sample_circular(
        Point2::from_vec(center),
        radius.abs(),
        start_angle,
        sweep,
        BULGE_ARC_POINTS,
    );
    pin_endpoints(&mut points, start, end);
    points
}

/// 逆时针圆弧，角度为弧度；起止角相同时视为整圆。
pub fn arc(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Vec<Point2> {
    arc_directed(center, radius, start_angle, end_angle, true)
}

/// 按指定方向离散圆弧，用于填充边界中的顺时针边。
pub fn arc_directed(
    center: Point2,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    counter_clockwise: bool,
) -> Vec<Point2> {
    let sweep = directed_sweep(start_angle, end_angle, counter_clockwise);
    sample_circular(center, radius.abs(), start_angle, sweep, ARC_POINTS)
}

/// 整圆，输出 `CIRCLE_SEGMENTS + 1` 个点且首尾相同。
pub fn circle(center: Point2, radius: f64) -> Vec<Point2> {
    let mut points = sample_circular(center, radius.abs(), 0.0, TAU, CIRCLE_SEGMENTS + 1);
    if let Some(first) = points.first().copied() {
        if let Some(last) = points.last_mut() {
            *last = first;
        }
    }
    points
}

pub fn ellipse(
    center: Point2,
    major_axis: Vector2,
    ratio: f64,
    start_parameter: f64,
    end_parameter: f64,
) -> Vec<Point2> {
    ellipse_directed(center, major_axis, ratio, start_parameter, end_parameter, true)
}

/// 椭圆弧：`P(t) = C + a·cos t + b·sin t`，`b` 为主轴逆时针旋转 90° 后乘以轴比。
pub fn ellipse_directed(
    center: Point2,
    major_axis: Vector2,
    ratio: f64,
    start_parameter: f64,
    end_parameter: f64,
    counter_clockwise: bool,
) -> Vec<Point2> {
    let sweep = directed_sweep(start_parameter, end_parameter, counter_clockwise);
    let major = major_axis.as_vec2();
    let minor = major.perp() * ratio;
    let origin = center.as_vec2();
    sample(ELLIPSE_POINTS, |t| {
        let parameter = start_parameter + sweep * t;
        Point2::from_vec(origin + major * parameter.cos() + minor * parameter.sin())
    })
}

/// 样条的离散化输入，兼容 SPLINE 实体与填充边界中的样条边。
#[derive(Debug, Clone, Copy)]
pub struct SplineInput<'a> {
    pub degree: i32,
    pub control_points: &'a [Point2],
    pub knot_values: &'a [f64],
    pub weights: &'a [f64],
    pub fit_points: &'a [Point2],
}

/// 在有效节点区间上用 de Boor 算法采样；节点向量不可用时依次回退到
/// 拟合点与控制多边形。
pub fn spline(input: SplineInput<'_>) -> Vec<Point2> {
    if let Some(curve) = BSpline::new(input) {
        return sample(SPLINE_POINTS, |t| curve.evaluate_normalized(t));
    }
    if input.fit_points.len() >= 2 {
        return input.fit_points.to_vec();
    }
    input.control_points.to_vec()
}

struct BSpline<'a> {
    degree: usize,
    control_points: &'a [Point2],
    knots: &'a [f64],
    weights: Option<&'a [f64]>,
    domain: (f64, f64),
}

impl<'a> BSpline<'a> {
    fn new(input: SplineInput<'a>) -> Option<Self> {
        if input.degree < 1 {
            return None;
        }
        let degree = input.degree as usize;
        let count = input.control_points.len();
        if count <= degree || input.knot_values.len() != count + degree + 1 {
            return None;
        }
        if input
            .knot_values
            .windows(2)
            .any(|pair| !(pair[1] >= pair[0]))
        {
            return None;
        }
        let domain = (input.knot_values[degree], input.knot_values[count]);
        if domain.1 - domain.0 <= ZERO_EPSILON {
            return None;
        }
        let weights = (input.weights.len() == count
            && input.weights.iter().all(|weight| weight.is_finite() && *weight > 0.0))
        .then_some(input.weights);
        Some(Self {
            degree,
            control_points: input.control_points,
            knots: input.knot_values,
            weights,
            domain,
        })
    }

    fn evaluate_normalized(&self, t: f64) -> Point2 {
        let (low, high) = self.domain;
        self.evaluate(low + (high - low) * t)
    }

    /// de Boor 求值，在齐次坐标下处理有理样条。
    fn evaluate(&self, u: f64) -> Point2 {
        let p = self.degree;
        let span = self.find_span(u);
        let mut points: Vec<(DVec2, f64)> = (0..=p)
            .map(|j| {
                let index = span + j - p;
                let weight = self.weights.map_or(1.0, |weights| weights[index]);
                (self.control_points[index].as_vec2() * weight, weight)
            })
            .collect();

        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = span + j - p;
                let denominator = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denominator.abs() <= ZERO_EPSILON {
                    0.0
                } else {
                    (u - self.knots[i]) / denominator
                };
                let (previous, previous_weight) = points[j - 1];
                let (current, current_weight) = points[j];
                points[j] = (
                    previous * (1.0 - alpha) + current * alpha,
                    previous_weight * (1.0 - alpha) + current_weight * alpha,
                );
            }
        }

        let (point, weight) = points[p];
        if weight.abs() <= ZERO_EPSILON {
            Point2::from_vec(point)
        } else {
            Point2::from_vec(point / weight)
        }
    }

    fn find_span(&self, u: f64) -> usize {
        let count = self.control_points.len();
        if u >= self.knots[count] {
            return count - 1;
        }
        let mut span = self.degree;
        while span + 1 < count && self.knots[span + 1] <= u {
            span += 1;
        }
        span
    }
}

fn directed_sweep(start: f64, end: f64, counter_clockwise: bool) -> f64 {
    if counter_clockwise {
        let sweep = (end - start).rem_euclid(TAU);
        if sweep <= ZERO_EPSILON { TAU } else { sweep }
    } else {
        let sweep = (start - end).rem_euclid(TAU);
        if sweep <= ZERO_EPSILON { -TAU } else { -sweep }
    }
}

fn sample_circular(
    center: Point2,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    count: usize,
) -> Vec<Point2> {
    let origin = center.as_vec2();
    sample(count, |t| {
        let angle = start_angle + sweep * t;
        Point2::from_vec(origin + DVec2::new(angle.cos(), angle.sin()) * radius)
    })
}

/// 在 `[0, 1]` 上均匀取 `count` 个参数（含两端）。
fn sample<F>(count: usize, mut at: F) -> Vec<Point2>
where
    F: FnMut(f64) -> Point2,
{
    match count {
        0 => Vec::new(),
        1 => vec![at(0.0)],
        _ => {
            let last = (count - 1) as f64;
            (0..count).map(|i| at(i as f64 / last)).collect()
        }
    }
}

fn pin_endpoints(points: &mut [Point2], start: Point2, end: Point2) {
    if let Some(first) = points.first_mut() {
        *first = start;
    }
    if let Some(last) = points.last_mut() {
        *last = end;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    fn assert_close(point: Point2, x: f64, y: f64) {
        assert!(
            (point.x() - x).abs() < 1e-9 && (point.y() - y).abs() < 1e-9,
            "期望 ({x}, {y})，实际 ({}, {})",
            point.x(),
            point.y()
        );
    }

    #[test]
    fn zero_bulge_returns_endpoints() {
        let points = bulge_arc(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 0.0);
        assert_eq!(points, vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]);
    }

    #[test]
    fn zero_chord_returns_single_point() {
        let points = bulge_arc(Point2::new(3.0, 4.0), Point2::new(3.0, 4.0), 0.5);
        assert_eq!(points, vec![Point2::new(3.0, 4.0)]);
    }

    #[test]
    fn positive_bulge_sweeps_counter_clockwise() {
        // bulge = 1 是以弦为直径的半圆；从 (0,0) 逆时针到 (10,0) 经过下方
        let points = bulge_arc(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 1.0);
        assert_eq!(points.len(), BULGE_ARC_POINTS);
        assert_close(points[0], 0.0, 0.0);
        assert_close(points[BULGE_ARC_POINTS - 1], 10.0, 0.0);
        for point in &points {
            let distance = point.distance(Point2::new(5.0, 0.0));
            assert!((distance - 5.0).abs() < 1e-9);
            assert!(point.y() <= 1e-9);
        }
    }

    #[test]
    fn negative_bulge_sweeps_clockwise() {
        let points = bulge_arc(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), -1.0);
        assert!(points.iter().all(|point| point.y() >= -1e-9));
        assert!(points.iter().any(|point| point.y() > 4.0));
    }

    #[test]
    fn small_bulge_keeps_center_on_left_side() {
        let bulge = (PI / 8.0).tan();
        let points = bulge_arc(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), bulge);
        // 圆心角 90°，圆心在 (1, 1)
        for point in &points {
            assert!((point.distance(Point2::new(1.0, 1.0)) - 2f64.sqrt()).abs() < 1e-9);
        }
        assert!(points[BULGE_ARC_POINTS / 2].y() < 0.0);
    }

    #[test]
    fn circle_is_closed_with_fixed_count() {
        let points = circle(Point2::new(1.0, 1.0), 2.0);
        assert_eq!(points.len(), CIRCLE_SEGMENTS + 1);
        assert_eq!(points[0], points[CIRCLE_SEGMENTS]);
        assert_close(points[0], 3.0, 1.0);
    }

    #[test]
    fn arc_wraps_across_zero_angle() {
        let points = arc(Point2::new(0.0, 0.0), 1.0, 3.0 * FRAC_PI_2, FRAC_PI_2);
        assert_eq!(points.len(), ARC_POINTS);
        assert_close(points[0], 0.0, -1.0);
        assert_close(points[ARC_POINTS - 1], 0.0, 1.0);
        assert!(points.iter().all(|point| point.x() >= -1e-9));
    }

    #[test]
    fn clockwise_arc_runs_backwards() {
        let points = arc_directed(Point2::new(0.0, 0.0), 1.0, 0.0, -FRAC_PI_2, false);
        assert_close(points[0], 1.0, 0.0);
        assert_close(points[ARC_POINTS - 1], 0.0, -1.0);
        assert!(points.iter().all(|point| point.y() <= 1e-9));
    }

    #[test]
    fn full_ellipse_returns_to_start() {
        let points = ellipse(Point2::new(0.0, 0.0), Vector2::new(4.0, 0.0), 0.5, 0.0, TAU);
        assert_eq!(points.len(), ELLIPSE_POINTS);
        assert_close(points[0], 4.0, 0.0);
        assert_close(points[ELLIPSE_POINTS - 1], 4.0, 0.0);
    }

    #[test]
    fn quadratic_bezier_spline_passes_through_midpoint() {
        let control = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 2.0),
            Point2::new(2.0, 0.0),
        ];
        let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let points = spline(SplineInput {
            degree: 2,
            control_points: &control,
            knot_values: &knots,
            weights: &[],
            fit_points: &[],
        });
        assert_eq!(points.len(), SPLINE_POINTS);
        assert_close(points[0], 0.0, 0.0);
        assert_close(points[SPLINE_POINTS - 1], 2.0, 0.0);
        // 二次 Bézier 在 t=0.5 处的最高点为 (1, 1)，采样点不会超过它
        assert!(points.iter().all(|point| point.y() <= 1.0 + 1e-9));
    }

    #[test]
    fn rational_spline_reproduces_quarter_circle() {
        let w = FRAC_PI_2.sin() / 2f64.sqrt();
        let control = [
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let weights = [1.0, w, 1.0];
        let points = spline(SplineInput {
            degree: 2,
            control_points: &control,
            knot_values: &knots,
            weights: &weights,
            fit_points: &[],
        });
        for point in &points {
            assert!((point.distance(Point2::new(0.0, 0.0)) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn spline_without_knots_falls_back() {
        let fit = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 0.0)];
        let control = [Point2::new(5.0, 5.0), Point2::new(6.0, 6.0)];
        let from_fit = spline(SplineInput {
            degree: 3,
            control_points: &control,
            knot_values: &[],
            weights: &[],
            fit_points: &fit,
        });
        assert_eq!(from_fit, fit.to_vec());

        let from_control = spline(SplineInput {
            degree: 3,
            control_points: &control,
            knot_values: &[],
            weights: &[],
            fit_points: &[],
        });
        assert_eq!(from_control, control.to_vec());
    }
}
