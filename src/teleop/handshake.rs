//! # Handshake Module
//!
//! Parameter-exchange and control-claim state machine for a teleoperation
//! session, plus contested-controller detection.
//!
//! The vehicle tracks its controlling ground station in the `SYSID_MYGCS`
//! parameter. Taking control means writing our own system id there and
//! sending a take-control message; releasing restores the id observed
//! before we took over. A `SYSID_MYGCS` reply naming neither of those
//! means another station may be contending for the vehicle.

use tracing::{debug, warn};

use super::command::{control_loops, Command};
use super::params::{
    GCS_FAILSAFE_DEPTH_HOLD, JS_PARAMS, PARAM_GCS_FAILSAFE, PARAM_GCS_OWNER,
};
use crate::mavlink::protocol::sub_mode;

/// Session phases, in the order a normal session traverses them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No link established
    Disconnected,
    /// Sockets opening
    Connecting,
    /// Asked the vehicle who controls it
    RequestingGcsOwner,
    /// Parameter list and failsafe configuration in flight
    Handshaking,
    /// Teleoperation session running
    Active,
    /// Control being handed back
    ReleasingControl,
}

/// Vehicle-facing session status, reported in every heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// Nothing initialized yet
    Uninitialized,
    /// Link up, session not started
    Boot,
    /// Session ended or not yet begun
    Standby,
    /// Session running
    Active,
    /// Shutting down
    PoweringOff,
}

impl SystemStatus {
    /// The MAV_STATE wire value for this status.
    #[must_use]
    pub fn mav_state(self) -> u8 {
        match self {
            SystemStatus::Uninitialized => 0,
            SystemStatus::Boot => 1,
            SystemStatus::Standby => 3,
            SystemStatus::Active => 4,
            SystemStatus::PoweringOff => 6,
        }
    }
}

/// Result of observing a controller-id parameter reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerObservation {
    /// The value names us or the recorded owner
    Expected,
    /// Another station took the controller id; recorded owner updated
    Contested,
}

/// Session identity and handshake state machine
///
/// Produces ordered [`Command`] lists for the connection supervisor to
/// transmit; never touches the link itself.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Our ground-station system id
    local_id: u8,
    /// The vehicle's system id
    remote_id: u8,
    /// Controller id observed before we took control
    previous_controller: u8,
    state: HandshakeState,
    status: SystemStatus,
    connected: bool,
}

impl Handshake {
    /// Creates a session for the given local and vehicle ids.
    #[must_use]
    pub fn new(local_id: u8, remote_id: u8) -> Self {
        Self {
            local_id,
            remote_id,
            previous_controller: 1,
            state: HandshakeState::Disconnected,
            status: SystemStatus::Uninitialized,
            connected: false,
        }
    }

    /// Our ground-station system id.
    #[must_use]
    pub fn local_id(&self) -> u8 {
        self.local_id
    }

    /// The vehicle's system id.
    #[must_use]
    pub fn remote_id(&self) -> u8 {
        self.remote_id
    }

    /// Current handshake phase.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Current vehicle-facing status.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        self.status
    }

    /// True while the link is believed up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True while a teleoperation session is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == HandshakeState::Active
    }

    /// Marks the link opening.
    pub fn connecting(&mut self) {
        self.state = HandshakeState::Connecting;
    }

    /// Link established: learn who controls the vehicle, fetch the full
    /// parameter list and arm the ground-station-lost failsafe.
    pub fn on_connected(&mut self) -> Vec<Command> {
        self.connected = true;
        self.status = SystemStatus::Boot;
        self.state = HandshakeState::RequestingGcsOwner;
        debug!("Sending GCS configuration");

        let commands = vec![
            Command::RequestParam(PARAM_GCS_OWNER.to_owned()),
            Command::RequestParamList,
            Command::SetParam {
                name: PARAM_GCS_FAILSAFE.to_owned(),
                value: GCS_FAILSAFE_DEPTH_HOLD,
            },
        ];
        self.state = HandshakeState::Handshaking;
        commands
    }

    /// Link lost.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.state = HandshakeState::Disconnected;
    }

    /// Begin-teleoperation event: claim control, sync tuning parameters,
    /// force manual mode, arm, idle the actuators and enable the
    /// downstream control loops.
    pub fn begin_session(&mut self, originator: &str) -> Vec<Command> {
        self.status = SystemStatus::Active;
        self.state = HandshakeState::Active;

        let mut commands = vec![
            Command::SetParam {
                name: PARAM_GCS_OWNER.to_owned(),
                value: f32::from(self.local_id),
            },
            Command::TakeControl,
        ];
        commands.extend(
            JS_PARAMS
                .iter()
                .map(|name| Command::RequestParam((*name).to_owned())),
        );
        commands.push(Command::RequestParam(PARAM_GCS_OWNER.to_owned()));
        commands.push(Command::SetMode(sub_mode::MANUAL));
        commands.push(Command::Arm);
        commands.push(Command::IdleActuators);
        commands.push(Command::EnableControlLoops(control_loops::TELEOPERATION));

        warn!("Started teleoperation requested by: {}", originator);
        commands
    }

    /// End-teleoperation event or deactivation: hand control back.
    pub fn end_session(&mut self) -> Vec<Command> {
        self.status = SystemStatus::Standby;
        self.state = HandshakeState::ReleasingControl;
        debug!("Disabling GCS control");

        let commands = vec![
            Command::IdleActuators,
            Command::ReleaseControl,
            Command::SetParam {
                name: PARAM_GCS_OWNER.to_owned(),
                value: f32::from(self.previous_controller),
            },
        ];
        self.state = HandshakeState::Handshaking;
        commands
    }

    /// Shutdown while a session may be running.
    pub fn powering_off(&mut self) {
        self.status = SystemStatus::PoweringOff;
    }

    /// Processes a `SYSID_MYGCS` reply.
    ///
    /// A value naming neither the recorded owner nor us means another
    /// station may be contending for control: the recorded owner is
    /// updated and a warning surfaced, with no corrective action.
    pub fn observe_controller(&mut self, value: f32) -> ControllerObservation {
        let previous = f32::from(self.previous_controller);
        let local = f32::from(self.local_id);
        if value != previous && value != local {
            debug!("Updating GCS owner from {} to {}", previous, value);
            self.previous_controller = value as u8;
            if self.is_active() {
                warn!("Vehicle ground control station is not this bridge");
            }
            ControllerObservation::Contested
        } else {
            ControllerObservation::Expected
        }
    }

    /// Controller id observed before we took control.
    #[must_use]
    pub fn previous_controller(&self) -> u8 {
        self.previous_controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake() -> Handshake {
        Handshake::new(254, 1)
    }

    #[test]
    fn test_initial_state() {
        let hs = handshake();
        assert_eq!(hs.state(), HandshakeState::Disconnected);
        assert_eq!(hs.status(), SystemStatus::Uninitialized);
        assert!(!hs.is_connected());
        assert_eq!(hs.previous_controller(), 1);
    }

    #[test]
    fn test_on_connected_sequence() {
        let mut hs = handshake();
        hs.connecting();
        let commands = hs.on_connected();

        assert_eq!(
            commands,
            vec![
                Command::RequestParam("SYSID_MYGCS".into()),
                Command::RequestParamList,
                Command::SetParam { name: "FS_GCS_ENABLE".into(), value: 3.0 },
            ]
        );
        assert!(hs.is_connected());
        assert_eq!(hs.state(), HandshakeState::Handshaking);
        assert_eq!(hs.status(), SystemStatus::Boot);
    }

    #[test]
    fn test_begin_session_sequence() {
        let mut hs = handshake();
        hs.on_connected();
        let commands = hs.begin_session("ccu-01");

        assert!(hs.is_active());
        assert_eq!(hs.status(), SystemStatus::Active);

        // Claim, take control, read seven parameters, manual mode, arm,
        // idle, enable loops
        assert_eq!(commands.len(), 13);
        assert_eq!(
            commands[0],
            Command::SetParam { name: "SYSID_MYGCS".into(), value: 254.0 }
        );
        assert_eq!(commands[1], Command::TakeControl);
        assert_eq!(commands[2], Command::RequestParam("JS_CAM_TILT_STEP".into()));
        assert_eq!(commands[8], Command::RequestParam("SYSID_MYGCS".into()));
        assert_eq!(commands[9], Command::SetMode(19));
        assert_eq!(commands[10], Command::Arm);
        assert_eq!(commands[11], Command::IdleActuators);
        assert_eq!(
            commands[12],
            Command::EnableControlLoops(control_loops::TELEOPERATION)
        );
    }

    #[test]
    fn test_end_session_restores_previous_controller() {
        let mut hs = handshake();
        hs.on_connected();
        hs.observe_controller(3.0); // another GCS owned the vehicle
        hs.begin_session("ccu-01");
        let commands = hs.end_session();

        assert_eq!(
            commands,
            vec![
                Command::IdleActuators,
                Command::ReleaseControl,
                Command::SetParam { name: "SYSID_MYGCS".into(), value: 3.0 },
            ]
        );
        assert!(!hs.is_active());
        assert_eq!(hs.status(), SystemStatus::Standby);
    }

    #[test]
    fn test_observe_controller_expected_values() {
        let mut hs = handshake();
        assert_eq!(hs.observe_controller(1.0), ControllerObservation::Expected);
        assert_eq!(hs.observe_controller(254.0), ControllerObservation::Expected);
        assert_eq!(hs.previous_controller(), 1);
    }

    #[test]
    fn test_observe_controller_contested_updates_owner() {
        let mut hs = handshake();
        assert_eq!(hs.observe_controller(7.0), ControllerObservation::Contested);
        assert_eq!(hs.previous_controller(), 7);

        // The new owner is now the recorded one
        assert_eq!(hs.observe_controller(7.0), ControllerObservation::Expected);
    }

    #[test]
    fn test_disconnect_resets_state() {
        let mut hs = handshake();
        hs.on_connected();
        hs.on_disconnected();
        assert!(!hs.is_connected());
        assert_eq!(hs.state(), HandshakeState::Disconnected);
    }

    #[test]
    fn test_mav_state_values() {
        assert_eq!(SystemStatus::Uninitialized.mav_state(), 0);
        assert_eq!(SystemStatus::Boot.mav_state(), 1);
        assert_eq!(SystemStatus::Standby.mav_state(), 3);
        assert_eq!(SystemStatus::Active.mav_state(), 4);
        assert_eq!(SystemStatus::PoweringOff.mav_state(), 6);
    }
}
