use super::slot::{Bounds, SlotSpec as S};

const PERCENT: Bounds = Bounds { min: 0.0, max: 100.0 };
const TRANSPONDER: Bounds = Bounds { min: 0.0, max: 7777.0 };

/// Every value the bridge mirrors. Order defines the store layout; appending
/// or reordering entries changes the shared-memory layout and must come with a
/// bump of `STORE_FORMAT_VERSION`.
pub(crate) const CATALOG: &[S] = &[
    // Aircraft: position, attitude, speeds
    S::scalar("Aircraft.UniversalTime").read_only(),
    S::scalar("Aircraft.Altitude").read_only(),
    S::scalar("Aircraft.VerticalSpeed").read_only(),
    S::scalar("Aircraft.Pitch").read_only(),
    S::scalar("Aircraft.Bank").read_only(),
    S::scalar("Aircraft.IndicatedAirspeed").read_only(),
    S::scalar("Aircraft.IndicatedAirspeedTrend").read_only(),
    S::scalar("Aircraft.GroundSpeed").read_only(),
    S::scalar("Aircraft.MagneticHeading").read_only(),
    S::scalar("Aircraft.TrueHeading").read_only(),
    S::scalar("Aircraft.Latitude").read_only(),
    S::scalar("Aircraft.Longitude").read_only(),
    S::scalar("Aircraft.Height").read_only(),
    S::vector3("Aircraft.Position").read_only(),
    S::vector3("Aircraft.Velocity").read_only(),
    S::vector3("Aircraft.AngularVelocity").read_only(),
    S::vector3("Aircraft.Acceleration").read_only(),
    S::vector3("Aircraft.Gravity").read_only(),
    S::vector3("Aircraft.Wind").read_only(),
    S::scalar("Aircraft.RateOfTurn").read_only(),
    S::scalar("Aircraft.MachNumber").read_only(),
    S::scalar("Aircraft.AngleOfAttack").read_only(),
    S::scalar("Aircraft.AngleOfAttackLimit").read_only(),
    S::scalar("Aircraft.AccelerationLimit").read_only(),
    S::scalar("Aircraft.RadarAltitude").read_only(),
    S::scalar("Aircraft.OnGround").read_only(),
    S::scalar("Aircraft.OnRunway").read_only(),
    S::scalar("Aircraft.Crashed").read_only(),
    S::scalar("Aircraft.Category.Jet").read_only(),
    S::scalar("Aircraft.Category.Glider").read_only(),
    S::scalar("Aircraft.Power").read_only(),
    S::scalar("Aircraft.NormalizedPower").read_only(),
    S::scalar("Aircraft.NormalizedPowerTarget").read_only(),
    S::text("Aircraft.Name", 32).read_only().default_text("Unknown"),
    // Aircraft: configuration state
    S::unit("Aircraft.Gear"),
    S::unit("Aircraft.Flaps"),
    S::unit("Aircraft.Slats"),
    S::unit("Aircraft.Throttle"),
    S::unit("Aircraft.AirBrake"),
    S::unit("Aircraft.GroundSpoilersArmed"),
    S::unit("Aircraft.GroundSpoilersExtended"),
    S::unit("Aircraft.ParkingBrake"),
    S::code("Aircraft.AutoBrakeSetting"),
    S::unit("Aircraft.AutoBrakeEngaged"),
    S::unit("Aircraft.AutoBrakeRejectedTakeOff"),
    S::bipolar("Aircraft.Trim"),
    S::bipolar("Aircraft.PitchTrim"),
    S::scalar("Aircraft.PitchTrimScaling").read_only(),
    S::bipolar("Aircraft.PitchTrimOffset"),
    S::bipolar("Aircraft.RudderTrim"),
    S::unit("Aircraft.AutoPitchTrim"),
    S::unit("Aircraft.YawDamperEnabled"),
    S::unit("Aircraft.RudderPedalsDisconnected"),
    S::unit("Aircraft.ThrottleLimit"),
    S::unit("Aircraft.Reverse"),
    S::unit("Aircraft.APUAvailable").read_only(),
    // Aircraft: engines
    S::unit("Aircraft.Starter"),
    S::unit("Aircraft.Starter1"),
    S::unit("Aircraft.Starter2"),
    S::unit("Aircraft.Starter3"),
    S::unit("Aircraft.Starter4"),
    S::unit("Aircraft.Ignition"),
    S::unit("Aircraft.Ignition1"),
    S::unit("Aircraft.Ignition2"),
    S::unit("Aircraft.Ignition3"),
    S::unit("Aircraft.Ignition4"),
    S::unit("Aircraft.EngineMaster1"),
    S::unit("Aircraft.EngineMaster2"),
    S::unit("Aircraft.EngineMaster3"),
    S::unit("Aircraft.EngineMaster4"),
    S::scalar("Aircraft.EngineThrottle1").read_only(),
    S::scalar("Aircraft.EngineThrottle2").read_only(),
    S::scalar("Aircraft.EngineThrottle3").read_only(),
    S::scalar("Aircraft.EngineThrottle4").read_only(),
    S::scalar("Aircraft.EngineRotationSpeed1").read_only(),
    S::scalar("Aircraft.EngineRotationSpeed2").read_only(),
    S::scalar("Aircraft.EngineRotationSpeed3").read_only(),
    S::scalar("Aircraft.EngineRotationSpeed4").read_only(),
    S::scalar("Aircraft.EngineRunning1").read_only(),
    S::scalar("Aircraft.EngineRunning2").read_only(),
    S::scalar("Aircraft.EngineRunning3").read_only(),
    S::scalar("Aircraft.EngineRunning4").read_only(),
    // Aircraft: airports and runways (simulator provided)
    S::text("Aircraft.NearestAirportIdentifier", 8).read_only().default_text("----"),
    S::text("Aircraft.NearestAirportName", 64).read_only().default_text("Unknown"),
    S::vector2("Aircraft.NearestAirportLocation").read_only(),
    S::scalar("Aircraft.NearestAirportElevation").read_only(),
    S::text("Aircraft.BestAirportIdentifier", 8).read_only().default_text("----"),
    S::text("Aircraft.BestAirportName", 64).read_only().default_text("Unknown"),
    S::vector2("Aircraft.BestAirportLocation").read_only(),
    S::scalar("Aircraft.BestAirportElevation").read_only(),
    S::text("Aircraft.BestRunwayIdentifier", 8).read_only().default_text("----"),
    S::scalar("Aircraft.BestRunwayElevation").read_only(),
    S::vector3("Aircraft.BestRunwayThreshold").read_only(),
    S::vector3("Aircraft.BestRunwayEnd").read_only(),
    // Performance speeds
    S::scalar("Performance.Speed.VS0").read_only(),
    S::scalar("Performance.Speed.VS1").read_only(),
    S::scalar("Performance.Speed.VFE").read_only(),
    S::scalar("Performance.Speed.VNO").read_only(),
    S::scalar("Performance.Speed.VNE").read_only(),
    S::scalar("Performance.Speed.VAPP").read_only(),
    S::scalar("Performance.Speed.Minimum").read_only(),
    S::scalar("Performance.Speed.Maximum").read_only(),
    S::scalar("Performance.Speed.MinimumFlapRetraction").read_only(),
    S::scalar("Performance.Speed.MaximumFlapExtension").read_only(),
    // Configuration
    S::unit("Configuration.SelectedTakeOffFlaps"),
    S::unit("Configuration.SelectedLandingFlaps"),
    S::text("FlightManagementSystem.FlightNumber", 16).read_only().default_text("----"),
    // Navigation
    S::scalar("Navigation.SelectedCourse1"),
    S::scalar("Navigation.SelectedCourse2"),
    S::text("Navigation.NAV1Identifier", 8).read_only(),
    S::scalar("Navigation.NAV1Frequency"),
    S::scalar("Navigation.NAV1StandbyFrequency"),
    S::event("Navigation.NAV1FrequencySwap"),
    S::text("Navigation.NAV2Identifier", 8).read_only(),
    S::scalar("Navigation.NAV2Frequency"),
    S::scalar("Navigation.NAV2StandbyFrequency"),
    S::event("Navigation.NAV2FrequencySwap"),
    S::scalar("Navigation.DME1Frequency"),
    S::scalar("Navigation.DME1Distance").read_only(),
    S::scalar("Navigation.DME1Time").read_only(),
    S::scalar("Navigation.DME1Speed").read_only(),
    S::scalar("Navigation.DME2Frequency"),
    S::scalar("Navigation.DME2Distance").read_only(),
    S::scalar("Navigation.DME2Time").read_only(),
    S::scalar("Navigation.DME2Speed").read_only(),
    S::text("Navigation.ILS1Identifier", 8).read_only(),
    S::scalar("Navigation.ILS1Course"),
    S::scalar("Navigation.ILS1Frequency"),
    S::scalar("Navigation.ILS1StandbyFrequency"),
    S::event("Navigation.ILS1FrequencySwap"),
    S::text("Navigation.ILS2Identifier", 8).read_only(),
    S::scalar("Navigation.ILS2Course"),
    S::scalar("Navigation.ILS2Frequency"),
    S::scalar("Navigation.ILS2StandbyFrequency"),
    S::event("Navigation.ILS2FrequencySwap"),
    S::scalar("Navigation.ADF1Frequency"),
    S::scalar("Navigation.ADF1StandbyFrequency"),
    S::event("Navigation.ADF1FrequencySwap"),
    S::scalar("Navigation.ADF2Frequency"),
    S::scalar("Navigation.ADF2StandbyFrequency"),
    S::event("Navigation.ADF2FrequencySwap"),
    // Communication
    S::scalar("Communication.COM1Frequency"),
    S::scalar("Communication.COM1StandbyFrequency"),
    S::event("Communication.COM1FrequencySwap"),
    S::scalar("Communication.COM2Frequency"),
    S::scalar("Communication.COM2StandbyFrequency"),
    S::event("Communication.COM2FrequencySwap"),
    S::scalar("Communication.COM3Frequency"),
    S::scalar("Communication.COM3StandbyFrequency"),
    S::event("Communication.COM3FrequencySwap"),
    S::scalar("Communication.TransponderCode").bounded(TRANSPONDER),
    S::scalar("Communication.TransponderCursor"),
    // Autopilot
    S::unit("Autopilot.Master"),
    S::event("Autopilot.Disengage"),
    S::scalar("Autopilot.Heading"),
    S::scalar("Autopilot.VerticalSpeed"),
    S::scalar("Autopilot.SelectedSpeed"),
    S::scalar("Autopilot.SelectedAirspeed"),
    S::scalar("Autopilot.SelectedHeading"),
    S::scalar("Autopilot.SelectedAltitude"),
    S::scalar("Autopilot.SelectedVerticalSpeed"),
    S::scalar("Autopilot.SelectedAltitudeScale"),
    S::text("Autopilot.ActiveLateralMode", 16).read_only(),
    S::text("Autopilot.ArmedLateralMode", 16).read_only(),
    S::text("Autopilot.ActiveVerticalMode", 16).read_only(),
    S::text("Autopilot.ArmedVerticalMode", 16).read_only(),
    S::text("Autopilot.ArmedApproachMode", 16).read_only(),
    S::text("Autopilot.ActiveAutoThrottleMode", 16).read_only(),
    S::text("Autopilot.ActiveCollectiveMode", 16).read_only(),
    S::text("Autopilot.ArmedCollectiveMode", 16).read_only(),
    S::text("Autopilot.Type", 16).read_only(),
    S::unit("Autopilot.Engaged"),
    S::unit("Autopilot.UseMachNumber"),
    S::unit("Autopilot.SpeedManaged"),
    S::scalar("Autopilot.TargetAirspeed").read_only(),
    S::scalar("Autopilot.Aileron").read_only(),
    S::scalar("Autopilot.Elevator").read_only(),
    S::unit("Autopilot.ThrottleEngaged"),
    S::scalar("Autopilot.ThrottleCommand").read_only(),
    // Flight director
    S::scalar("FlightDirector.Pitch").read_only(),
    S::scalar("FlightDirector.Bank").read_only(),
    S::scalar("FlightDirector.Yaw").read_only(),
    // Copilot
    S::scalar("Copilot.Heading").read_only(),
    S::scalar("Copilot.Altitude").read_only(),
    S::scalar("Copilot.Airspeed").read_only(),
    S::scalar("Copilot.VerticalSpeed").read_only(),
    S::scalar("Copilot.Aileron").read_only(),
    S::scalar("Copilot.Elevator").read_only(),
    S::scalar("Copilot.Throttle").read_only(),
    S::unit("Copilot.AutoRudder"),
    // Controls: primary flight controls
    S::bipolar("Controls.Pitch.Input"),
    S::bipolar("Controls.Pitch.InputOffset"),
    S::bipolar("Controls.Roll.Input"),
    S::bipolar("Controls.Roll.InputOffset"),
    S::bipolar("Controls.Yaw.Input"),
    S::unit("Controls.Yaw.InputActive"),
    // Controls: thrust
    S::unit("Controls.Throttle"),
    S::unit("Controls.Throttle1"),
    S::unit("Controls.Throttle2"),
    S::unit("Controls.Throttle3"),
    S::unit("Controls.Throttle4"),
    S::event("Controls.Throttle1Move"),
    S::event("Controls.Throttle2Move"),
    S::event("Controls.Throttle3Move"),
    S::event("Controls.Throttle4Move"),
    S::unit("Controls.ThrustReverse"),
    S::unit("Controls.ThrustReverse1"),
    S::unit("Controls.ThrustReverse2"),
    S::unit("Controls.ThrustReverse3"),
    S::unit("Controls.ThrustReverse4"),
    S::unit("Controls.Mixture"),
    S::unit("Controls.Mixture1"),
    S::unit("Controls.Mixture2"),
    S::unit("Controls.Mixture3"),
    S::unit("Controls.Mixture4"),
    S::unit("Controls.PropellerSpeed1"),
    S::unit("Controls.PropellerSpeed2"),
    S::unit("Controls.PropellerSpeed3"),
    S::unit("Controls.PropellerSpeed4"),
    S::code("Controls.Magnetos1"),
    S::code("Controls.Magnetos2"),
    S::code("Controls.FuelSelector"),
    S::unit("Controls.FuelShutOff"),
    // Controls: high lift, gear, brakes
    S::unit("Controls.Flaps"),
    S::event("Controls.FlapsEvent"),
    S::unit("Controls.Gear"),
    S::event("Controls.GearToggle"),
    S::unit("Controls.WheelBrake.Left"),
    S::unit("Controls.WheelBrake.Right"),
    S::unit("Controls.WheelBrake.LeftActive"),
    S::unit("Controls.WheelBrake.RightActive"),
    S::unit("Controls.AirBrake"),
    S::unit("Controls.AirBrakeActive"),
    S::unit("Controls.AirBrake.Arm"),
    S::unit("Controls.GliderAirBrake"),
    // Controls: trim and steering
    S::bipolar("Controls.Trim"),
    S::event("Controls.TrimStep"),
    S::event("Controls.TrimMove"),
    S::bipolar("Controls.AileronTrim"),
    S::bipolar("Controls.RudderTrim"),
    S::bipolar("Controls.Tiller"),
    S::unit("Controls.PedalsDisconnect"),
    S::unit("Controls.NoseWheelSteering"),
    // Controls: rotorcraft
    S::unit("Controls.Collective"),
    S::bipolar("Controls.CyclicPitch"),
    S::bipolar("Controls.CyclicRoll"),
    S::bipolar("Controls.TailRotor"),
    S::unit("Controls.RotorBrake"),
    S::unit("Controls.HelicopterThrottle1"),
    S::unit("Controls.HelicopterThrottle2"),
    // Controls: cabin
    S::unit("Controls.Lighting.Panel"),
    S::unit("Controls.Lighting.Instruments"),
    S::unit("Controls.Lighting.LeftCabinOverheadLight"),
    S::unit("Controls.Lighting.RightCabinOverheadLight"),
    S::unit("Controls.LeftSunBlocker"),
    S::unit("Controls.RightSunBlocker"),
    S::unit("Controls.HideYoke.Left"),
    S::unit("Controls.HideYoke.Right"),
    // Doors and windows
    S::unit("Doors.Left"),
    S::unit("Doors.Right"),
    S::unit("Doors.LeftHandle"),
    S::unit("Doors.RightHandle"),
    S::unit("Windows.Left"),
    S::unit("Windows.Right"),
    // Pressurization
    S::scalar("Pressurization.LandingElevation"),
    S::unit("Pressurization.LandingElevationManual"),
    // Warnings
    S::code("Warnings.MasterWarning").read_only(),
    S::code("Warnings.MasterCaution").read_only(),
    S::code("Warnings.EngineFire").read_only(),
    S::code("Warnings.LowOilPressure").read_only(),
    S::code("Warnings.LowFuelPressure").read_only(),
    S::code("Warnings.LowHydraulicPressure").read_only(),
    S::code("Warnings.LowVoltage").read_only(),
    S::code("Warnings.AltitudeAlert").read_only(),
    S::code("Warnings.WarningActive").read_only(),
    S::unit("Warnings.WarningMute"),
    // View
    S::event("View.Internal"),
    S::event("View.Follow"),
    S::event("View.External"),
    S::event("View.Category"),
    S::event("View.Mode"),
    S::scalar("View.Zoom"),
    S::bipolar("View.Pan.Horizontal"),
    S::bipolar("View.Pan.Vertical"),
    S::event("View.Pan.Center"),
    S::bipolar("View.Look.Horizontal"),
    S::bipolar("View.Look.Vertical"),
    S::bipolar("View.Roll"),
    S::scalar("View.OffsetX"),
    S::scalar("View.OffsetY"),
    S::scalar("View.OffsetZ"),
    S::vector3("View.Position").read_only(),
    S::vector3("View.Direction").read_only(),
    S::vector3("View.Up").read_only(),
    S::scalar("View.FieldOfView").read_only(),
    S::scalar("View.AspectRatio").read_only(),
    S::vector3("View.FreePosition"),
    S::vector3("View.FreeLookDirection"),
    S::vector3("View.FreeUp"),
    S::scalar("View.FreeFieldOfView"),
    // Simulation
    S::unit("Simulation.Pause"),
    S::event("Simulation.FlightInformation"),
    S::event("Simulation.MovingMap"),
    S::unit("Simulation.Sound"),
    S::event("Simulation.LiftUp"),
    S::vector3("Simulation.SettingPosition"),
    S::vector3("Simulation.SettingVelocity"),
    S::event("Simulation.SettingSet"),
    S::event("Simulation.TimeChange"),
    S::scalar("Simulation.Visibility").bounded(PERCENT),
    S::scalar("Simulation.Time").read_only(),
    S::unit("Simulation.UseMouseControl"),
    S::event("Simulation.PlaybackStart"),
    S::event("Simulation.PlaybackStop"),
    S::unit("Simulation.PlaybackSetPosition"),
    S::vector3("Simulation.ExternalPosition"),
    // Command (menu navigation triggers)
    S::event("Command.Execute"),
    S::event("Command.Back"),
    S::event("Command.Up"),
    S::event("Command.Down"),
    S::event("Command.Left"),
    S::event("Command.Right"),
    S::event("Command.MoveHorizontal"),
    S::event("Command.MoveVertical"),
    S::event("Command.Rotate"),
    S::event("Command.Zoom"),
    // Engine instruments
    S::scalar("Engine.FuelFlow1").read_only(),
    S::scalar("Engine.FuelFlow2").read_only(),
    S::scalar("Engine.FuelFlow3").read_only(),
    S::scalar("Engine.FuelFlow4").read_only(),
    S::scalar("Engine.OilPressure1").read_only(),
    S::scalar("Engine.OilPressure2").read_only(),
    S::scalar("Engine.OilPressure3").read_only(),
    S::scalar("Engine.OilPressure4").read_only(),
    S::scalar("Engine.OilTemperature1").read_only(),
    S::scalar("Engine.OilTemperature2").read_only(),
    S::scalar("Engine.OilTemperature3").read_only(),
    S::scalar("Engine.OilTemperature4").read_only(),
    S::scalar("Engine.ExhaustGasTemperature1").read_only(),
    S::scalar("Engine.ExhaustGasTemperature2").read_only(),
    S::scalar("Engine.ExhaustGasTemperature3").read_only(),
    S::scalar("Engine.ExhaustGasTemperature4").read_only(),
    S::scalar("Engine.ManifoldPressure1").read_only(),
    S::scalar("Engine.ManifoldPressure2").read_only(),
    S::scalar("Engine.N1Speed1").read_only(),
    S::scalar("Engine.N1Speed2").read_only(),
    S::scalar("Engine.N1Speed3").read_only(),
    S::scalar("Engine.N1Speed4").read_only(),
    S::scalar("Engine.N2Speed1").read_only(),
    S::scalar("Engine.N2Speed2").read_only(),
    S::scalar("Engine.N2Speed3").read_only(),
    S::scalar("Engine.N2Speed4").read_only(),
    S::scalar("Engine.Torque1").read_only(),
    S::scalar("Engine.Torque2").read_only(),
    // Fuel and electrical
    S::scalar("Fuel.TotalQuantity").read_only(),
    S::scalar("Fuel.LeftTankQuantity").read_only(),
    S::scalar("Fuel.RightTankQuantity").read_only(),
    S::scalar("Fuel.CenterTankQuantity").read_only(),
    S::unit("Fuel.Pump1"),
    S::unit("Fuel.Pump2"),
    S::unit("Fuel.CrossFeed"),
    S::unit("Electrical.Battery"),
    S::unit("Electrical.Alternator1"),
    S::unit("Electrical.Alternator2"),
    S::unit("Electrical.Avionics"),
    S::unit("Electrical.ExternalPower"),
    S::scalar("Electrical.BusVoltage").read_only(),
    S::scalar("Electrical.BatteryCharge").read_only(),
    // Exterior lights
    S::unit("Lights.Landing"),
    S::unit("Lights.Taxi"),
    S::unit("Lights.Navigation"),
    S::unit("Lights.Strobe"),
    S::unit("Lights.Beacon"),
    S::unit("Lights.Logo"),
    S::unit("Lights.Wing"),
    S::unit("Lights.RunwayTurnoff"),
    // Environment (simulator provided)
    S::scalar("Environment.OutsideAirTemperature").read_only(),
    S::scalar("Environment.StaticPressure").read_only(),
    S::scalar("Environment.AirDensity").read_only(),
    S::scalar("Environment.WindDirection").read_only(),
    S::scalar("Environment.WindSpeed").read_only(),
    S::scalar("Environment.Turbulence").read_only(),
    S::scalar("Environment.CloudCover").read_only(),
    S::scalar("Environment.Precipitation").read_only(),
    // Anti-ice
    S::unit("AntiIce.Pitot"),
    S::unit("AntiIce.Engine1"),
    S::unit("AntiIce.Engine2"),
    S::unit("AntiIce.Wing"),
];
