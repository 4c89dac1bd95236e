//! Tick-driven HUD smoothing.
//!
//! Targets arrive once per decoded sample through [`DisplaySink`]; the
//! displayed values chase them every render tick. Gear is a step value and
//! the anomaly warning bypasses smoothing entirely.

use std::time::Duration;

use tracing::error;
use twin_ingest_core::{DisplaySink, DisplayUpdate, IngestError, LogThrottle};

pub const SPEED_RATE: f32 = 10.0;
pub const RPM_RATE: f32 = 10.0;
pub const PEDAL_RATE: f32 = 15.0;
pub const TEMP_RATE: f32 = 2.0;

pub const ANOMALY_TEXT: &str = "WARNING: ENGINE OVERHEAT";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const YELLOW: Color = Color::rgba(1.0, 1.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgba(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color = Color::rgba(0.0, 0.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Exponential approach of `current` to `target`. The step fraction is
/// `dt * rate` clamped to 1, so the result never passes the target.
///
/// Snaps once a step can no longer move the value; near large targets the
/// last gap is a single f32 ulp and would otherwise never close.
pub fn interp_to(current: f32, target: f32, dt: f32, rate: f32) -> f32 {
    if rate <= 0.0 {
        return target;
    }
    let dist = target - current;
    if dist * dist < 1e-8 {
        return target;
    }
    let step = dist * (dt * rate).clamp(0.0, 1.0);
    let next = current + step;
    if step != 0.0 && (next == current || (target - next) * dist <= 0.0) {
        return target;
    }
    next
}

/// White up to 6000, yellow above 6000, red above 7500 (both strict).
pub fn rpm_color(rpm: f32) -> Color {
    if rpm > 7500.0 {
        Color::RED
    } else if rpm > 6000.0 {
        Color::YELLOW
    } else {
        Color::WHITE
    }
}

/// Blue below 50 degC, red above 100 degC, green in between.
pub fn temp_color(temp: f32) -> Color {
    if temp < 50.0 {
        Color::BLUE
    } else if temp > 100.0 {
        Color::RED
    } else {
        Color::GREEN
    }
}

pub fn throttle_fill(throttle: f32) -> Color {
    Color::rgba(0.0, 1.0, 0.0, 0.5 + throttle * 0.5)
}

pub fn brake_fill(brake: f32) -> Color {
    Color::rgba(1.0, 0.0, 0.0, 0.5 + brake * 0.5)
}

/// Widget layer the smoother draws into.
pub trait HudSurface: Send {
    fn set_speed_text(&mut self, text: &str);
    fn set_rpm_text(&mut self, text: &str, color: Color);
    fn set_gear_text(&mut self, text: &str);
    fn set_throttle_bar(&mut self, percent: f32, fill: Color);
    fn set_brake_bar(&mut self, percent: f32, fill: Color);
    fn set_temp_text(&mut self, text: &str, color: Color);
    fn show_warning(&mut self, text: &str, color: Color);
    fn hide_warning(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Channel {
    pub target: f32,
    pub displayed: f32,
}

impl Channel {
    fn step(&mut self, dt: f32, rate: f32) {
        self.displayed = interp_to(self.displayed, self.target, dt, rate);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    pub speed: Channel,
    pub rpm: Channel,
    pub throttle: Channel,
    pub brake: Channel,
    pub temp: Channel,
    pub steering: f32,
    pub target_gear: i32,
    /// Last gear written to the surface.
    pub displayed_gear: Option<i32>,
    pub anomaly: bool,
}

#[derive(Default)]
pub struct DisplaySmoother {
    state: DisplayState,
    surface: Option<Box<dyn HudSurface>>,
    warnings: LogThrottle,
}

impl DisplaySmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(mut self, surface: impl HudSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warnings = LogThrottle::new(interval);
        self
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// One render tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let s = &mut self.state;
        s.speed.step(dt, SPEED_RATE);
        s.rpm.step(dt, RPM_RATE);
        s.throttle.step(dt, PEDAL_RATE);
        s.brake.step(dt, PEDAL_RATE);
        s.temp.step(dt, TEMP_RATE);

        let Some(surface) = self.surface.as_mut() else {
            if self.warnings.allow("surface") {
                error!(error = %IngestError::MissingCollaborator("hud surface"), "nothing to draw into");
            }
            return;
        };

        surface.set_speed_text(&format!("{:.0}", s.speed.displayed));
        surface.set_rpm_text(&format!("{:.0}", s.rpm.displayed), rpm_color(s.rpm.displayed));

        if s.displayed_gear != Some(s.target_gear) {
            s.displayed_gear = Some(s.target_gear);
            surface.set_gear_text(&s.target_gear.to_string());
        }

        surface.set_throttle_bar(s.throttle.displayed, throttle_fill(s.throttle.displayed));
        surface.set_brake_bar(s.brake.displayed, brake_fill(s.brake.displayed));
        surface.set_temp_text(&format!("{:.1} °C", s.temp.displayed), temp_color(s.temp.displayed));
    }
}

impl DisplaySink for DisplaySmoother {
    fn update_telemetry(&mut self, u: &DisplayUpdate) {
        let s = &mut self.state;
        s.speed.target = u.speed_kmh;
        s.rpm.target = u.rpm;
        s.throttle.target = u.throttle;
        s.brake.target = u.brake;
        s.temp.target = u.engine_temp;
        s.steering = u.steering;
        s.target_gear = u.gear;
        s.anomaly = u.is_anomaly;

        if let Some(surface) = self.surface.as_mut() {
            if u.is_anomaly {
                surface.show_warning(ANOMALY_TEXT, Color::RED);
            } else {
                surface.hide_warning();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Draw {
        Speed(String),
        Rpm(String, Color),
        Gear(String),
        Throttle(f32, Color),
        Brake(f32, Color),
        Temp(String, Color),
        Warning(Option<(String, Color)>),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Draw>>>);

    impl Recorder {
        fn take(&self) -> Vec<Draw> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    impl HudSurface for Recorder {
        fn set_speed_text(&mut self, text: &str) { self.0.lock().push(Draw::Speed(text.into())); }
        fn set_rpm_text(&mut self, text: &str, color: Color) { self.0.lock().push(Draw::Rpm(text.into(), color)); }
        fn set_gear_text(&mut self, text: &str) { self.0.lock().push(Draw::Gear(text.into())); }
        fn set_throttle_bar(&mut self, percent: f32, fill: Color) { self.0.lock().push(Draw::Throttle(percent, fill)); }
        fn set_brake_bar(&mut self, percent: f32, fill: Color) { self.0.lock().push(Draw::Brake(percent, fill)); }
        fn set_temp_text(&mut self, text: &str, color: Color) { self.0.lock().push(Draw::Temp(text.into(), color)); }
        fn show_warning(&mut self, text: &str, color: Color) { self.0.lock().push(Draw::Warning(Some((text.into(), color)))); }
        fn hide_warning(&mut self) { self.0.lock().push(Draw::Warning(None)); }
    }

    fn update(speed: f32, rpm: f32, gear: i32, anomaly: bool) -> DisplayUpdate {
        DisplayUpdate {
            speed_kmh: speed, rpm, gear, throttle: 0.5, brake: 0.0,
            steering: 0.0, engine_temp: 80.0, is_anomaly: anomaly,
        }
    }

    #[test]
    fn interp_never_overshoots() {
        assert_eq!(interp_to(0.0, 100.0, 0.5, 10.0), 100.0); // fraction clamps at 1
        assert!((interp_to(0.0, 100.0, 0.01, 10.0) - 10.0).abs() < 1e-3);
        assert_eq!(interp_to(5.0, 100.0, 0.1, 0.0), 100.0);
        assert_eq!(interp_to(99.99999, 100.0, 0.01, 2.0), 100.0);
        assert!((interp_to(100.0, 0.0, 0.05, 10.0) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn constant_targets_converge_monotonically() {
        let mut hud = DisplaySmoother::new();
        hud.update_telemetry(&update(100.0, 3000.0, 3, false));
        let mut prev = hud.state().clone();
        for _ in 0..200 {
            hud.tick(1.0 / 60.0);
            let s = hud.state();
            for (before, now) in [
                (prev.speed, s.speed),
                (prev.rpm, s.rpm),
                (prev.throttle, s.throttle),
                (prev.temp, s.temp),
            ] {
                assert!(now.displayed >= before.displayed);
                assert!(now.displayed <= now.target);
            }
            prev = s.clone();
        }
        assert_eq!(prev.speed.displayed, 100.0);
        assert_eq!(prev.rpm.displayed, 3000.0);
    }

    #[test]
    fn high_rpm_targets_settle_exactly() {
        for target in [3000.0, 6000.0, 7500.0, 7501.0, 18000.0] {
            let mut v = 0.0;
            for _ in 0..1000 {
                v = interp_to(v, target, 1.0 / 60.0, RPM_RATE);
            }
            assert_eq!(v, target);
        }

        let mut v = 5000.0;
        for _ in 0..1000 {
            v = interp_to(v, 7501.0, 1.0 / 60.0, RPM_RATE);
        }
        assert_eq!(rpm_color(v), Color::RED);
    }

    #[test]
    fn temperature_lags_speed() {
        let mut hud = DisplaySmoother::new();
        hud.update_telemetry(&update(100.0, 3000.0, 3, false));
        hud.tick(0.05);
        let s = hud.state();
        assert!((s.speed.displayed / s.speed.target) > (s.temp.displayed / s.temp.target));
        assert!(s.throttle.displayed > 0.5 * 0.7);
    }

    #[test]
    fn rpm_thresholds_are_strict() {
        assert_eq!(rpm_color(5999.0), Color::WHITE);
        assert_eq!(rpm_color(6000.0), Color::WHITE);
        assert_eq!(rpm_color(6000.5), Color::YELLOW);
        assert_eq!(rpm_color(7500.0), Color::YELLOW);
        assert_eq!(rpm_color(7500.5), Color::RED);
    }

    #[test]
    fn temperature_bands() {
        assert_eq!(temp_color(49.9), Color::BLUE);
        assert_eq!(temp_color(50.0), Color::GREEN);
        assert_eq!(temp_color(100.0), Color::GREEN);
        assert_eq!(temp_color(100.1), Color::RED);
    }

    #[test]
    fn pedal_bars_brighten_with_input() {
        assert_eq!(throttle_fill(0.0), Color::rgba(0.0, 1.0, 0.0, 0.5));
        assert_eq!(throttle_fill(1.0), Color::GREEN);
        assert_eq!(brake_fill(0.5), Color::rgba(1.0, 0.0, 0.0, 0.75));
    }

    #[test]
    fn gear_text_only_redraws_on_change() {
        let rec = Recorder::default();
        let mut hud = DisplaySmoother::new().with_surface(rec.clone());
        hud.update_telemetry(&update(50.0, 2000.0, 2, false));
        rec.take();
        hud.tick(0.016);
        hud.tick(0.016);
        let gears = |d: &[Draw]| d.iter().filter(|x| matches!(x, Draw::Gear(_))).count();
        assert_eq!(gears(&rec.take()), 1);

        hud.update_telemetry(&update(50.0, 2000.0, 3, false));
        hud.tick(0.016);
        let draws = rec.take();
        assert!(draws.contains(&Draw::Gear("3".into())));
        hud.tick(0.016);
        assert_eq!(gears(&rec.take()), 0);
    }

    #[test]
    fn anomaly_warning_is_immediate() {
        let rec = Recorder::default();
        let mut hud = DisplaySmoother::new().with_surface(rec.clone());
        hud.update_telemetry(&update(100.0, 3000.0, 3, false));
        assert_eq!(rec.take(), vec![Draw::Warning(None)]);

        hud.update_telemetry(&update(100.0, 3000.0, 3, true));
        assert_eq!(rec.take(), vec![Draw::Warning(Some((ANOMALY_TEXT.into(), Color::RED)))]);
        assert!(hud.state().anomaly);
        // smoothing has not advanced
        assert_eq!(hud.state().speed.displayed, 0.0);
    }

    #[test]
    fn tick_formats_widgets() {
        let rec = Recorder::default();
        let mut hud = DisplaySmoother::new().with_surface(rec.clone());
        hud.update_telemetry(&DisplayUpdate {
            speed_kmh: 212.4, rpm: 7800.0, gear: 6, throttle: 1.0, brake: 0.0,
            steering: 0.0, engine_temp: 40.0, is_anomaly: false,
        });
        rec.take();
        hud.tick(1.0);
        assert_eq!(
            rec.take(),
            vec![
                Draw::Speed("212".into()),
                Draw::Rpm("7800".into(), Color::RED),
                Draw::Gear("6".into()),
                Draw::Throttle(1.0, Color::GREEN),
                Draw::Brake(0.0, Color::rgba(1.0, 0.0, 0.0, 0.5)),
                Draw::Temp("40.0 °C".into(), Color::BLUE),
            ]
        );
    }

    #[test]
    fn ticks_without_surface_still_smooth() {
        let mut hud = DisplaySmoother::new();
        hud.update_telemetry(&update(100.0, 3000.0, 3, true));
        hud.tick(0.05);
        assert!((hud.state().speed.displayed - 50.0).abs() < 1e-3);
        assert_eq!(hud.state().displayed_gear, None);
    }
}
