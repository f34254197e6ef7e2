//! # Bridge Module
//!
//! The connection supervisor: owns the vehicle link, the packet router and
//! the teleoperation state, and drives the single cooperative loop.
//!
//! One iteration performs a bounded inbound drain (parse + dispatch), the
//! heartbeat check, then at most one pending operator-intent event. All
//! mutation of control state happens on this loop; a reconnect is a
//! blocking inline call by whichever path discovered the fault.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::Result;
use crate::link::{ArdupilotLink, HeartbeatTimer, HEARTBEAT_PERIOD};
use crate::mavlink::decoder::{decode_param_value, decode_rc_channels, decode_system_time};
use crate::mavlink::encoder::MavEncoder;
use crate::mavlink::protocol::{
    MavFrame, RcChannelsFeedback, SystemTime, MSG_ID_PARAM_VALUE, MSG_ID_RC_CHANNELS,
    MSG_ID_SYSTEM_TIME,
};
use crate::mavlink::router::PacketRouter;
use crate::teleop::actions::TeleopEvent;
use crate::teleop::command::Command;
use crate::teleop::handshake::Handshake;
use crate::teleop::params::{
    ParamRegistry, PARAM_CAM_TILT_STEP, PARAM_GAIN_STEPS, PARAM_GCS_OWNER, PARAM_LIGHTS_STEPS,
    PARAM_THR_GAIN,
};
use crate::teleop::translator::ActionTranslator;

/// Inbound read buffer size
const RECV_BUF_LEN: usize = 512;

/// Upper bound on drain iterations per loop cycle, so a chatty vehicle
/// cannot starve outbound processing
const MAX_DRAIN_PER_CYCLE: usize = 100;

/// Callback invoked when downstream control loops should be enabled
pub type ControlLoopHook = Box<dyn Fn(u32) + Send>;

/// Teleoperation state mutated by inbound packets and operator events
///
/// Kept separate from the router and the link so packet handlers can take
/// `&mut TeleopCore` while the router drives the parse.
pub struct TeleopCore {
    translator: ActionTranslator,
    registry: ParamRegistry,
    handshake: Handshake,
    remote_time: Option<SystemTime>,
    last_rc: Option<RcChannelsFeedback>,
}

impl TeleopCore {
    /// Creates the core around a configured translator and session.
    #[must_use]
    pub fn new(translator: ActionTranslator, handshake: Handshake) -> Self {
        Self {
            translator,
            registry: ParamRegistry::new(),
            handshake,
            remote_time: None,
            last_rc: None,
        }
    }

    /// The actuator/control translator.
    #[must_use]
    pub fn translator(&self) -> &ActionTranslator {
        &self.translator
    }

    /// The remote parameter shadow registry.
    #[must_use]
    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    /// The session state machine.
    #[must_use]
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Most recent SYSTEM_TIME reading, if any.
    #[must_use]
    pub fn remote_time(&self) -> Option<SystemTime> {
        self.remote_time
    }

    /// Most recent RC channel telemetry, if any.
    #[must_use]
    pub fn last_rc(&self) -> Option<RcChannelsFeedback> {
        self.last_rc
    }

    pub(crate) fn translator_mut(&mut self) -> &mut ActionTranslator {
        &mut self.translator
    }

    pub(crate) fn handshake_mut(&mut self) -> &mut Handshake {
        &mut self.handshake
    }

    /// Applies one operator event and returns the outbound commands it
    /// produced, in transmission order.
    pub fn handle_event(&mut self, event: &TeleopEvent) -> Vec<Command> {
        match event {
            TeleopEvent::Start { originator } => {
                info!("Gain is at {:.0} percent", self.translator.control().gain * 100.0);
                self.handshake.begin_session(originator)
            }
            TeleopEvent::Stop => self.handshake.end_session(),
            TeleopEvent::Actions(actions) => self.translator.apply(actions),
        }
    }

    /// PARAM_VALUE handler: shadow every reply, write the joystick tuning
    /// parameters through to control state, watch the controller id.
    fn handle_param_value(&mut self, frame: &MavFrame) {
        let param = match decode_param_value(frame) {
            Ok(param) => param,
            Err(e) => {
                warn!("Discarding malformed PARAM_VALUE: {}", e);
                return;
            }
        };
        debug!(
            "Received parameter {} with value {}",
            param.param_id, param.param_value
        );
        self.registry.update(&param.param_id, param.param_value);

        match param.param_id.as_str() {
            PARAM_THR_GAIN => self.translator.control_mut().throttle_gain = param.param_value,
            PARAM_LIGHTS_STEPS => self.translator.control_mut().light_step = param.param_value,
            PARAM_CAM_TILT_STEP => self.translator.control_mut().camera_step = param.param_value,
            PARAM_GAIN_STEPS => {
                if param.param_value != self.translator.gain_step() {
                    debug!(
                        "Vehicle gain step {} differs from configured {}",
                        param.param_value,
                        self.translator.gain_step()
                    );
                }
            }
            PARAM_GCS_OWNER => {
                let _ = self.handshake.observe_controller(param.param_value);
            }
            _ => {}
        }
    }

    /// SYSTEM_TIME handler.
    fn handle_system_time(&mut self, frame: &MavFrame) {
        match decode_system_time(frame) {
            Ok(time) => {
                trace!("Vehicle boot time {} ms", time.time_boot_ms);
                self.remote_time = Some(time);
            }
            Err(e) => warn!("Discarding malformed SYSTEM_TIME: {}", e),
        }
    }

    /// RC_CHANNELS handler.
    fn handle_rc_channels(&mut self, frame: &MavFrame) {
        match decode_rc_channels(frame) {
            Ok(rc) => {
                for (i, pwm) in rc.channels.iter().enumerate() {
                    trace!("RC channel {} PWM {}", i + 1, pwm);
                }
                self.last_rc = Some(rc);
            }
            Err(e) => warn!("Discarding malformed RC_CHANNELS: {}", e),
        }
    }
}

/// The teleoperation bridge: link + router + core + heartbeat
pub struct Bridge {
    core: TeleopCore,
    router: PacketRouter<TeleopCore>,
    link: ArdupilotLink,
    encoder: MavEncoder,
    heartbeat: HeartbeatTimer,
    events: mpsc::UnboundedReceiver<TeleopEvent>,
    poll_timeout: Duration,
    reconnect_interval: Duration,
    on_control_loops: Option<ControlLoopHook>,
    /// Link generation as of the last handshake, to catch inline reopens
    link_generation: u64,
    buf: [u8; RECV_BUF_LEN],
}

impl Bridge {
    /// Builds a bridge from configuration and an operator event source.
    ///
    /// # Errors
    ///
    /// Returns error if the configured remote address does not parse.
    pub fn new(config: &Config, events: mpsc::UnboundedReceiver<TeleopEvent>) -> Result<Self> {
        let remote = config.remote_endpoint()?;
        let local_id = config.control.local_system_id;
        let vehicle_id = config.control.vehicle_system_id;

        let translator = ActionTranslator::new(config.calibrations(), config.control.gain_step);
        let handshake = Handshake::new(local_id, vehicle_id);

        let mut router = PacketRouter::new();
        router.register(MSG_ID_PARAM_VALUE, TeleopCore::handle_param_value);
        router.register(MSG_ID_SYSTEM_TIME, TeleopCore::handle_system_time);
        router.register(MSG_ID_RC_CHANNELS, TeleopCore::handle_rc_channels);

        Ok(Self {
            core: TeleopCore::new(translator, handshake),
            router,
            link: ArdupilotLink::new(
                remote,
                config.link.command_port,
                config.link.telemetry_port,
            ),
            encoder: MavEncoder::new(local_id, 1, vehicle_id, 1),
            heartbeat: HeartbeatTimer::new(HEARTBEAT_PERIOD),
            events,
            poll_timeout: Duration::from_millis(config.link.poll_timeout_ms),
            reconnect_interval: Duration::from_millis(config.link.reconnect_interval_ms),
            on_control_loops: None,
            link_generation: 0,
            buf: [0u8; RECV_BUF_LEN],
        })
    }

    /// Installs the host callback for control-loop enablement.
    pub fn set_control_loop_hook(&mut self, hook: ControlLoopHook) {
        self.on_control_loops = Some(hook);
    }

    /// Read access to the teleoperation state, mainly for embedding hosts.
    #[must_use]
    pub fn core(&self) -> &TeleopCore {
        &self.core
    }

    /// Opens the link and runs the connect-time handshake.
    ///
    /// # Errors
    ///
    /// Returns error if the sockets cannot be opened; the handshake is
    /// only attempted on success.
    pub async fn connect(&mut self) -> Result<()> {
        self.core.handshake_mut().connecting();
        self.link.open().await?;
        self.on_link_established().await;
        Ok(())
    }

    /// Resets the heartbeat timer and replays the connect-time handshake.
    ///
    /// Runs after every successful open, including reopens a faulting send
    /// or receive performed inline.
    async fn on_link_established(&mut self) {
        self.link_generation = self.link.generation();
        self.heartbeat.reset();

        let commands = self.core.handshake_mut().on_connected();
        for command in commands {
            self.execute(command).await;
        }
    }

    /// Runs the supervision loop until the stop signal is observed.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) {
        info!("Ardupilot teleoperation bridge starting");
        if let Err(e) = self.connect().await {
            warn!("Connection failed: {}", e);
            self.core.handshake_mut().on_disconnected();
        }

        while !*shutdown.borrow() {
            if self.link.has_sockets() {
                if self.link.generation() != self.link_generation {
                    self.on_link_established().await;
                }
                self.drain_inbound().await;

                if self.heartbeat.overflow() {
                    let status = self.core.handshake().status().mav_state();
                    let frame = self.encoder.heartbeat(status);
                    self.link.send(&frame).await;
                    trace!("Sent heartbeat");
                }
            } else {
                // Fixed backoff before each reopen attempt
                tokio::time::sleep(self.reconnect_interval).await;
                if let Err(e) = self.connect().await {
                    warn!("Connection failed: {}", e);
                    self.core.handshake_mut().on_disconnected();
                }
            }

            match self.events.try_recv() {
                Ok(event) => self.process_event(event).await,
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    debug!("Operator event source closed");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Applies one operator event: execute its commands, then transmit the
    /// actuator vector unconditionally for action cycles.
    pub async fn process_event(&mut self, event: TeleopEvent) {
        let actuate = matches!(event, TeleopEvent::Actions(_));
        let commands = self.core.handle_event(&event);
        for command in commands {
            self.execute(command).await;
        }
        if actuate {
            self.actuate().await;
        }
    }

    /// Bounded inbound drain: parse and dispatch what arrived.
    async fn drain_inbound(&mut self) {
        let mut counter = 0;
        while counter < MAX_DRAIN_PER_CYCLE {
            let Some(n) = self.link.recv(&mut self.buf, self.poll_timeout).await else {
                break;
            };
            if n == 0 {
                break;
            }
            self.router.feed(&self.buf[..n], &mut self.core);
            counter += 1;
        }
    }

    /// Transmits the current actuator vector.
    async fn actuate(&mut self) {
        let pulses = self.core.translator().channels().override_pulses();
        let frame = self.encoder.rc_channels_override(&pulses);
        self.link.send(&frame).await;
    }

    /// Turns one command into wire bytes or a host call.
    async fn execute(&mut self, command: Command) {
        match command {
            Command::RequestParamList => {
                let frame = self.encoder.param_request_list();
                self.link.send(&frame).await;
            }
            Command::RequestParam(name) => {
                info!("Requesting parameter: {}", name);
                let frame = self.encoder.param_request_read(&name);
                self.link.send(&frame).await;
            }
            Command::SetParam { name, value } => {
                info!("Setting parameter: {} {}", name, value);
                let frame = self.encoder.param_set(&name, value);
                self.link.send(&frame).await;
            }
            Command::TakeControl => {
                let frame = self.encoder.change_operator_control(false);
                self.link.send(&frame).await;
            }
            Command::ReleaseControl => {
                let frame = self.encoder.change_operator_control(true);
                self.link.send(&frame).await;
            }
            Command::SetMode(mode) => {
                debug!("Set mode to {}", mode);
                let frame = self.encoder.set_mode(mode);
                self.link.send(&frame).await;
            }
            Command::Arm => {
                trace!("Sending arm command");
                let frame = self.encoder.command_arm_disarm(true);
                self.link.send(&frame).await;
            }
            Command::Disarm => {
                let frame = self.encoder.command_arm_disarm(false);
                self.link.send(&frame).await;
            }
            Command::IdleActuators => {
                self.core.translator_mut().idle();
                self.actuate().await;
            }
            Command::EnableControlLoops(mask) => match &self.on_control_loops {
                Some(hook) => hook(mask),
                None => info!("Enabling control loops {:#07b}", mask),
            },
        }
    }

    /// Final teardown: release control if a session is still running.
    async fn shutdown(&mut self) {
        if self.core.handshake().is_active() {
            warn!("Deactivating Ardupilot control");
            let commands = self.core.handshake_mut().end_session();
            for command in commands {
                self.execute(command).await;
            }
            self.core.handshake_mut().powering_off();
            // Let the release and idle frames land before the sockets drop
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.link.close();
        self.core.handshake_mut().on_disconnected();
        info!("Bridge stopped");
    }
}
