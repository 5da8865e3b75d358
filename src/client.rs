use crate::command::{Command, CommandParams};
use crate::config::ClientConfig;
use crate::connection::{self, Endpoint, ExchangeLimits};
use crate::error::{AnthemError, Result};
use crate::profile::ModelProfile;
use crate::sources::SourceMap;
use crate::state::{StateStore, ZoneState};
use crate::types::{Model, PowerState, VolumeRange, Zone, VOLUME};
use std::sync::Arc;
use std::time::Instant;

/// Client for an Anthem receiver
///
/// Every operation performs at most one connect/send/receive exchange and
/// then folds the reply into the per-zone state the client keeps. Operations
/// take `&mut self`, so a client never has two requests in flight. The
/// protocol has no request ids; callers running several clients against the
/// same receiver must serialize them.
///
/// A failed exchange is logged, marks the addressed zone `Off` and is
/// returned as an error. Configuration mistakes (unknown command, missing or
/// malformed parameter, unknown source) are returned without touching state.
pub struct AnthemClient {
    config: ClientConfig,
    profile: Arc<ModelProfile>,
    sources: SourceMap,
    endpoint: Endpoint,
    limits: ExchangeLimits,
    volume: VolumeRange,
    store: StateStore,
}

impl AnthemClient {
    /// Create a client using the model's built-in profile
    ///
    /// No connection is made until the first operation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use anthemav::{AnthemClient, ClientConfig, Model, Zone};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut client = AnthemClient::new(ClientConfig::new("192.168.1.50", Model::X00))?;
    ///     let state = client.update().await?;
    ///     println!("Source: {:?}", state.source());
    ///
    ///     client.set_volume(Zone::MAIN, 0.5).await?;
    ///     client.set_source(Zone::MAIN, "CD").await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let profile = ModelProfile::for_model(config.model)?;
        Self::with_profile(config, Arc::new(profile))
    }

    /// Create a client around an already built profile
    ///
    /// Lets several clients share one compiled profile, or run against
    /// custom tables.
    pub fn with_profile(config: ClientConfig, profile: Arc<ModelProfile>) -> Result<Self> {
        config.validate()?;
        if profile.model() != config.model {
            return Err(AnthemError::InvalidConfig(format!(
                "profile is for model {} but configuration says {}",
                profile.model(),
                config.model
            )));
        }

        let sources = config
            .sources
            .clone()
            .unwrap_or_else(|| profile.sources().clone());

        Ok(Self {
            endpoint: config.endpoint(),
            limits: config.limits(),
            volume: config.volume(),
            sources,
            profile,
            config,
            store: StateStore::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn model(&self) -> Model {
        self.profile.model()
    }

    pub fn profile(&self) -> &Arc<ModelProfile> {
        &self.profile
    }

    /// Zone used by [`update`](Self::update)
    pub fn default_zone(&self) -> Zone {
        self.config.zone
    }

    // ========== Exchange ==========

    /// Send a command and merge the reply into state
    ///
    /// Returns the updated state of `params.zone`.
    pub async fn send_command(&mut self, command: Command, params: CommandParams) -> Result<ZoneState> {
        let zone = params.zone;
        self.request(command, params).await?;
        Ok(self.store.snapshot(zone))
    }

    /// Send a command, merge the reply into state and return the reply as
    /// received
    ///
    /// Useful for queries whose answer has no zone field, such as
    /// [`Command::ModelQuery`].
    pub async fn request(&mut self, command: Command, params: CommandParams) -> Result<String> {
        let zone = params.zone;
        let template = self.profile.commands().template(command)?;
        let zone_scoped = template.references("zone");
        let payload = self.profile.resolve(command, &params)?;

        tracing::debug!("Command {:?} for zone {} -> {:?}", command, zone, payload);

        let response = match connection::exchange(&self.endpoint, &payload, &self.limits).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{:?} for zone {} failed: {}", command, zone, e);
                if zone_scoped {
                    self.store.set_power(zone, PowerState::Off);
                }
                return Err(e);
            }
        };

        self.apply_response(zone, zone_scoped, &response);
        Ok(response)
    }

    fn apply_response(&mut self, zone: Zone, zone_scoped: bool, response: &str) {
        let extracted = self.profile.parse(response);

        let power = match extracted.get(&zone) {
            Some(fields) => match fields.power() {
                Some("0") => PowerState::Off,
                _ if fields.is_empty() => PowerState::Off,
                // A zone in standby only ever answers with the standby
                // form, so any other field means it is awake.
                _ => PowerState::On,
            },
            None => {
                tracing::debug!("No fields for zone {} in {:?}", zone, response);
                PowerState::Off
            }
        };

        self.store.merge(extracted);
        if zone_scoped {
            self.store.set_power(zone, power);
        }
    }

    // ========== State ==========

    /// Query a zone's full status
    pub async fn query(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::ZoneQuery, CommandParams::new(zone))
            .await
    }

    /// Query the configured zone
    pub async fn update(&mut self) -> Result<ZoneState> {
        self.query(self.config.zone).await
    }

    /// Last known fields of a zone
    pub fn zone_state(&self, zone: Zone) -> Option<&ZoneState> {
        self.store.zone(zone)
    }

    /// Zones that have reported at least one field
    pub fn zones(&self) -> Vec<Zone> {
        self.store.zones().collect()
    }

    /// When a reply was last received
    pub fn last_update(&self) -> Option<Instant> {
        self.store.last_update()
    }

    // ========== Power ==========

    pub fn power_state(&self, zone: Zone) -> PowerState {
        self.store.power(zone)
    }

    pub fn is_on(&self, zone: Zone) -> bool {
        self.power_state(zone) == PowerState::On
    }

    pub async fn set_power(&mut self, zone: Zone, on: bool) -> Result<ZoneState> {
        let command = if on { Command::PowerOn } else { Command::PowerOff };
        self.send_command(command, CommandParams::new(zone)).await
    }

    pub async fn power_on(&mut self, zone: Zone) -> Result<ZoneState> {
        self.set_power(zone, true).await
    }

    pub async fn power_off(&mut self, zone: Zone) -> Result<ZoneState> {
        self.set_power(zone, false).await
    }

    pub async fn query_power(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::PowerQuery, CommandParams::new(zone))
            .await
    }

    // ========== Volume ==========

    /// Set the volume on a 0.0 to 1.0 scale
    ///
    /// The value is mapped onto the configured device range and clamped.
    pub async fn set_volume(&mut self, zone: Zone, volume: f64) -> Result<ZoneState> {
        if volume.is_nan() {
            return Err(AnthemError::InvalidVolume(volume));
        }
        let raw = self.volume.to_device(volume);
        self.set_volume_raw(zone, raw).await
    }

    /// Set the volume in device units
    pub async fn set_volume_raw(&mut self, zone: Zone, raw: i32) -> Result<ZoneState> {
        self.send_command(Command::VolumeSet, CommandParams::new(zone).with_volume(raw))
            .await
    }

    /// Step the volume up, by the receiver's default step when `step` is `None`
    pub async fn volume_up(&mut self, zone: Zone, step: Option<u32>) -> Result<ZoneState> {
        self.send_command(Command::VolumeUp, step_params(zone, step))
            .await
    }

    /// Step the volume down, by the receiver's default step when `step` is `None`
    pub async fn volume_down(&mut self, zone: Zone, step: Option<u32>) -> Result<ZoneState> {
        self.send_command(Command::VolumeDown, step_params(zone, step))
            .await
    }

    pub async fn query_volume(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::VolumeQuery, CommandParams::new(zone))
            .await
    }

    /// Last known volume in device units
    pub fn volume_raw(&self, zone: Zone) -> Result<i32> {
        let raw = self
            .store
            .zone(zone)
            .and_then(|state| state.volume())
            .ok_or(AnthemError::NoData { zone, field: VOLUME })?;
        raw.parse()
            .map_err(|_| AnthemError::InvalidResponse(format!("volume {:?} for zone {}", raw, zone)))
    }

    /// Last known volume on the 0.0 to 1.0 scale
    pub fn volume_normalized(&self, zone: Zone) -> Result<f64> {
        self.volume_raw(zone).map(|raw| self.volume.to_normalized(raw))
    }

    // ========== Mute ==========

    pub async fn set_mute(&mut self, zone: Zone, mute: bool) -> Result<ZoneState> {
        let command = if mute { Command::MuteOn } else { Command::MuteOff };
        self.send_command(command, CommandParams::new(zone)).await
    }

    pub async fn toggle_mute(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::MuteToggle, CommandParams::new(zone))
            .await
    }

    pub async fn query_mute(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::MuteQuery, CommandParams::new(zone))
            .await
    }

    /// Last known mute state, `None` if never reported
    pub fn is_muted(&self, zone: Zone) -> Option<bool> {
        self.store
            .zone(zone)
            .and_then(|state| state.mute())
            .map(|mute| mute != "0")
    }

    // ========== Source ==========

    /// Select an input by its display name
    pub async fn set_source(&mut self, zone: Zone, name: &str) -> Result<ZoneState> {
        let code = self.sources.resolve(name)?.to_string();
        self.send_command(Command::SourceSet, CommandParams::new(zone).with_source(code))
            .await
    }

    pub async fn query_source(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::SourceQuery, CommandParams::new(zone))
            .await
    }

    /// Display name of the last known source
    ///
    /// Falls back to the raw code when the source map does not know it.
    pub fn source_name(&self, zone: Zone) -> Option<String> {
        let code = self.store.zone(zone)?.source()?;
        Some(
            self.sources
                .name(code)
                .map(str::to_string)
                .unwrap_or_else(|| code.to_string()),
        )
    }

    /// Selectable source names
    pub fn source_list(&self) -> Vec<String> {
        self.sources.names()
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    // ========== Other queries ==========

    /// Query the active decoder (x00 only)
    pub async fn query_decoder(&mut self, zone: Zone) -> Result<ZoneState> {
        self.send_command(Command::DecoderQuery, CommandParams::new(zone))
            .await
    }

    /// Model name reported by the receiver (x10/x20 only)
    pub async fn query_model(&mut self) -> Result<String> {
        self.query_text(Command::ModelQuery, CommandParams::new(self.config.zone), "IDQ")
            .await
    }

    /// Hardware revision reported by the receiver (x10/x20 only)
    pub async fn query_hardware(&mut self) -> Result<String> {
        self.query_text(Command::HardwareQuery, CommandParams::new(self.config.zone), "IDH")
            .await
    }

    /// Number of active inputs (x10/x20 only)
    pub async fn query_input_count(&mut self) -> Result<u32> {
        let count = self
            .query_text(Command::SourceActiveQuery, CommandParams::new(self.config.zone), "ICN")
            .await?;
        count
            .parse()
            .map_err(|_| AnthemError::InvalidResponse(format!("input count {:?}", count)))
    }

    /// Name the receiver shows for an input slot (x10/x20 only)
    pub async fn query_input_name(&mut self, source_num: u32, long: bool) -> Result<String> {
        let (command, opcode) = if long {
            (Command::SourceNameLongQuery, "ILN")
        } else {
            (Command::SourceNameShortQuery, "ISN")
        };
        let params = CommandParams::new(self.config.zone).with_source_num(source_num);
        let reply = self.query_text(command, params, opcode).await?;
        // The reply repeats the slot number ahead of the name
        Ok(reply
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .to_string())
    }

    async fn query_text(
        &mut self,
        command: Command,
        params: CommandParams,
        opcode: &str,
    ) -> Result<String> {
        let reply = self.request(command, params).await?;
        reply_value(&reply, opcode).ok_or_else(|| {
            AnthemError::InvalidResponse(format!("expected {} reply, got {:?}", opcode, reply))
        })
    }
}

/// Text following `opcode` in a reply, without the statement terminator
fn reply_value(reply: &str, opcode: &str) -> Option<String> {
    let start = reply.find(opcode)? + opcode.len();
    let value = &reply[start..];
    let value = value.split(';').next().unwrap_or(value);
    Some(value.trim().to_string())
}

fn step_params(zone: Zone, step: Option<u32>) -> CommandParams {
    let params = CommandParams::new(zone);
    match step {
        Some(step) => params.with_step(step),
        None => params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn client(model: Model) -> AnthemClient {
        AnthemClient::new(ClientConfig::new("127.0.0.1", model)).unwrap()
    }

    #[test]
    fn x00_status_reply_turns_zone_on() {
        let mut client = client(Model::X00);
        client.apply_response(Zone::MAIN, true, "P1S3V-40M0D2");

        let state = client.zone_state(Zone::MAIN).unwrap();
        assert_eq!(state.source(), Some("3"));
        assert_eq!(state.volume(), Some("-40"));
        assert_eq!(state.mute(), Some("0"));
        assert_eq!(state.decoder(), Some("2"));
        assert_eq!(state.power(), None);
        assert_eq!(client.power_state(Zone::MAIN), PowerState::On);

        let volume = client.volume_normalized(Zone::MAIN).unwrap();
        assert!((volume - 0.667).abs() < 0.001, "volume was {}", volume);
        assert_eq!(client.source_name(Zone::MAIN).as_deref(), Some("TV"));
        assert_eq!(client.is_muted(Zone::MAIN), Some(false));
    }

    #[test]
    fn standby_reply_turns_zone_off_and_keeps_fields() {
        let mut client = client(Model::X00);
        client.apply_response(Zone::MAIN, true, "P1S3V-40M0D2");
        client.apply_response(Zone::MAIN, true, "Main.Off");

        assert_eq!(client.power_state(Zone::MAIN), PowerState::Off);
        let state = client.zone_state(Zone::MAIN).unwrap();
        assert_eq!(state.power(), Some("0"));
        assert_eq!(state.volume(), Some("-40"));
    }

    #[test]
    fn reply_for_another_zone_leaves_requested_zone_off() {
        let mut client = client(Model::X00);
        client.apply_response(Zone::MAIN, true, "P2S1V-50M1D0");

        assert_eq!(client.power_state(Zone::MAIN), PowerState::Off);
        assert_eq!(client.power_state(Zone::ZONE2), PowerState::Unknown);
        assert_eq!(client.zone_state(Zone::ZONE2).and_then(|z| z.volume()), Some("-50"));
        assert_eq!(client.zones(), vec![Zone::ZONE2]);
    }

    #[test]
    fn x10_power_field_drives_state() {
        let mut client = client(Model::X10);
        client.apply_response(Zone::MAIN, true, "Z1POW1;");
        assert!(client.is_on(Zone::MAIN));

        client.apply_response(Zone::MAIN, true, "!ZZ1MUT1;");
        assert_eq!(client.power_state(Zone::MAIN), PowerState::Off);
    }

    #[test]
    fn global_queries_do_not_move_power_state() {
        let mut client = client(Model::X10);
        client.apply_response(Zone::MAIN, true, "Z1POW1;");
        client.apply_response(Zone::MAIN, false, "IDQMRX 720;");
        assert_eq!(client.power_state(Zone::MAIN), PowerState::On);
    }

    #[test]
    fn volume_never_observed_is_no_data() {
        let client = client(Model::X00);
        assert!(matches!(
            client.volume_normalized(Zone::MAIN),
            Err(AnthemError::NoData { zone: Zone::MAIN, field: "volume" })
        ));
        assert_eq!(client.is_muted(Zone::MAIN), None);
        assert_eq!(client.source_name(Zone::MAIN), None);
    }

    #[test]
    fn non_numeric_volume_is_invalid_response() {
        let mut client = client(Model::X00);
        let mut zones = BTreeMap::new();
        zones.insert(Zone::MAIN, [(VOLUME, "loud")].into_iter().collect::<ZoneState>());
        client.store.merge(zones);

        assert!(matches!(
            client.volume_raw(Zone::MAIN),
            Err(AnthemError::InvalidResponse(_))
        ));
        assert!(matches!(
            client.volume_normalized(Zone::MAIN),
            Err(AnthemError::InvalidResponse(_))
        ));
    }

    #[test]
    fn x10_volume_reply_keeps_zone_on() {
        let mut client = client(Model::X10);
        client.apply_response(Zone::MAIN, true, "Z1POW1;");
        client.apply_response(Zone::MAIN, true, "Z1VOL-45;");

        assert!(client.is_on(Zone::MAIN));
        assert_eq!(client.volume_raw(Zone::MAIN).unwrap(), -45);
    }

    #[test]
    fn reply_value_strips_opcode_and_terminator() {
        assert_eq!(reply_value("IDQMRX 720;", "IDQ").as_deref(), Some("MRX 720"));
        assert_eq!(reply_value("ICN8", "ICN").as_deref(), Some("8"));
        assert_eq!(reply_value("ISN01Blu-ray;", "ISN").as_deref(), Some("01Blu-ray"));
        assert_eq!(reply_value("Z1POW1;", "IDQ"), None);
    }

    #[test]
    fn unknown_source_code_falls_back_to_code() {
        let mut client = client(Model::X00);
        client.apply_response(Zone::MAIN, true, "P1Sz");
        assert_eq!(client.source_name(Zone::MAIN).as_deref(), Some("z"));
    }

    #[test]
    fn configured_sources_replace_defaults() {
        let sources: SourceMap = [("1", "Blu-ray")].into_iter().collect();
        let client = AnthemClient::new(ClientConfig::new("127.0.0.1", Model::X00).sources(sources)).unwrap();
        assert_eq!(client.source_list(), vec!["Blu-ray".to_string()]);
        assert!(client.sources().code("CD").is_none());
    }

    #[test]
    fn construction_validates_config() {
        let config = ClientConfig::new("127.0.0.1", Model::X00).volume_range(0, 0);
        assert!(matches!(AnthemClient::new(config), Err(AnthemError::InvalidConfig(_))));

        let profile = Arc::new(ModelProfile::for_model(Model::X10).unwrap());
        let config = ClientConfig::new("127.0.0.1", Model::X00);
        assert!(matches!(
            AnthemClient::with_profile(config, profile),
            Err(AnthemError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn configuration_errors_leave_state_untouched() {
        let mut client = client(Model::X00);

        let err = client.set_source(Zone::MAIN, "Vinyl").await.unwrap_err();
        assert!(matches!(err, AnthemError::UnknownSource(_)));

        let err = client
            .send_command(Command::ModelQuery, CommandParams::new(Zone::MAIN))
            .await
            .unwrap_err();
        assert!(matches!(err, AnthemError::UnknownCommand { .. }));

        let err = client
            .send_command(Command::VolumeSet, CommandParams::new(Zone::MAIN))
            .await
            .unwrap_err();
        assert!(matches!(err, AnthemError::MissingParameter { .. }));

        let err = client.set_volume(Zone::MAIN, f64::NAN).await.unwrap_err();
        assert!(matches!(err, AnthemError::InvalidVolume(_)));

        assert_eq!(client.power_state(Zone::MAIN), PowerState::Unknown);
        assert!(client.last_update().is_none());
    }
}
