use std::f64::consts::TAU;

use glam::{DVec2, DVec3};

use aerobridge::{CommandValue, OutgoingCommand, SimMessage, SimValue};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const GRAVITY: f64 = 9.81;
const KNOTS_PER_MPS: f64 = 1.943_844;

/// A synthetic aircraft flying a slow circuit, standing in for the
/// simulation when the bridge runs on its own. Commands coming back from
/// clients move its controls.
#[derive(Debug, Clone)]
pub struct SyntheticFlight {
    time: f64,
    origin: DVec2,
    position: DVec3,
    heading: f64,
    airspeed: f64,
    vertical_speed: f64,
    bank: f64,
    throttle: f64,
    flaps: f64,
    gear: f64,
    pitch_input: f64,
    roll_input: f64,
    applied_commands: u64,
}

impl SyntheticFlight {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            // Frankfurt
            origin: DVec2::new(50.0379, 8.5622),
            position: DVec3::new(0.0, 0.0, 1500.0),
            heading: 0.0,
            airspeed: 65.0,
            vertical_speed: 0.0,
            bank: 0.0,
            throttle: 0.6,
            flaps: 0.0,
            gear: 0.0,
            pitch_input: 0.0,
            roll_input: 0.0,
            applied_commands: 0,
        }
    }

    pub fn applied_commands(&self) -> u64 {
        self.applied_commands
    }

    /// Applies drained commands. Unknown names are ignored, the bridge has
    /// already validated everything it hands back.
    pub fn apply(&mut self, commands: &[OutgoingCommand]) {
        for command in commands {
            let CommandValue::Scalar(value) = command.value else {
                continue;
            };
            let target = match command.name {
                "Controls.Throttle" | "Aircraft.Throttle" => &mut self.throttle,
                "Controls.Flaps" | "Aircraft.Flaps" => &mut self.flaps,
                "Controls.Gear" | "Aircraft.Gear" => &mut self.gear,
                "Controls.Pitch.Input" => &mut self.pitch_input,
                "Controls.Roll.Input" => &mut self.roll_input,
                "Controls.GearToggle" => {
                    self.gear = if self.gear > 0.5 { 0.0 } else { 1.0 };
                    self.applied_commands += 1;
                    continue;
                }
                _ => continue,
            };
            *target = value;
            self.applied_commands += 1;
        }
    }

    /// Advances by `dt` seconds and returns the values for this tick.
    pub fn step(&mut self, dt: f64) -> Vec<SimMessage> {
        self.time += dt;

        let target_speed = 40.0 + 60.0 * self.throttle - 15.0 * self.flaps - 5.0 * self.gear;
        self.airspeed += (target_speed - self.airspeed) * (dt * 0.2).min(1.0);

        // Gentle standard-rate circuit, biased by the roll input.
        let circuit_bank = 0.25 * (self.time * TAU / 240.0).sin();
        self.bank = (circuit_bank + 0.5 * self.roll_input).clamp(-0.8, 0.8);
        let turn_rate = GRAVITY * self.bank.tan() / self.airspeed.max(1.0);
        self.heading = (self.heading + turn_rate * dt).rem_euclid(TAU);

        self.vertical_speed = 8.0 * self.pitch_input + 2.0 * (self.throttle - 0.6);
        let velocity = DVec3::new(
            self.airspeed * self.heading.sin(),
            self.airspeed * self.heading.cos(),
            self.vertical_speed,
        );
        self.position += velocity * dt;
        self.position.z = self.position.z.max(0.0);

        let latitude = self.origin.x + (self.position.y / EARTH_RADIUS_M).to_degrees();
        let longitude = self.origin.y
            + (self.position.x / (EARTH_RADIUS_M * self.origin.x.to_radians().cos())).to_degrees();
        let pitch = (self.vertical_speed / self.airspeed.max(1.0)).atan();

        vec![
            SimMessage::named("Aircraft.UniversalTime", self.time),
            SimMessage::named("Aircraft.Altitude", self.position.z),
            SimMessage::named("Aircraft.Height", self.position.z),
            SimMessage::named("Aircraft.VerticalSpeed", self.vertical_speed),
            SimMessage::named("Aircraft.Pitch", pitch),
            SimMessage::named("Aircraft.Bank", self.bank),
            SimMessage::named("Aircraft.IndicatedAirspeed", self.airspeed),
            SimMessage::named("Aircraft.GroundSpeed", self.airspeed),
            SimMessage::named("Aircraft.MachNumber", self.airspeed / 340.3),
            SimMessage::named("Aircraft.TrueHeading", self.heading),
            SimMessage::named("Aircraft.MagneticHeading", (self.heading - 0.05).rem_euclid(TAU)),
            SimMessage::named("Aircraft.RateOfTurn", turn_rate),
            SimMessage::named("Aircraft.Latitude", latitude.to_radians()),
            SimMessage::named("Aircraft.Longitude", longitude.to_radians()),
            SimMessage::named("Aircraft.Position", self.position),
            SimMessage::named("Aircraft.Velocity", velocity),
            SimMessage::named("Aircraft.Gravity", DVec3::new(0.0, 0.0, -GRAVITY)),
            SimMessage::named("Aircraft.OnGround", f64::from(self.position.z <= 0.0)),
            SimMessage::named("Aircraft.Throttle", self.throttle),
            SimMessage::named("Aircraft.Flaps", self.flaps),
            SimMessage::named("Aircraft.Gear", self.gear),
            SimMessage::named("Controls.Throttle", self.throttle),
            SimMessage::named("Controls.Flaps", self.flaps),
            SimMessage::named("Controls.Gear", self.gear),
            SimMessage::named("Aircraft.Name", SimValue::Text("Synthetic C172".into())),
            SimMessage::named("Aircraft.NearestAirportIdentifier", SimValue::Text("EDDF".into())),
            SimMessage::named(
                "Aircraft.NearestAirportName",
                SimValue::Text("Frankfurt am Main".into()),
            ),
            SimMessage::named("Aircraft.NearestAirportLocation", self.origin),
        ]
    }

    pub fn indicated_knots(&self) -> f64 {
        self.airspeed * KNOTS_PER_MPS
    }
}
