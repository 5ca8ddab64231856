use crate::core::{
    AudioBackend, AudioError, Automation, ContextState, DroneSpec, FilterKind, NoiseBuffer,
    ParamEvent, Source, SubGraph, TimerHost, TimerId, Voice, Waveform,
};
use fnv::FnvHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

/// [`AudioBackend`] on a browser `AudioContext`.
pub struct WebAudio {
    ctx: web::AudioContext,
    // One AudioBuffer per noise length; the core cache keeps one buffer per length too
    buffers: RefCell<FnvHashMap<usize, web::AudioBuffer>>,
}

pub struct WebDrone {
    osc: web::OscillatorNode,
    lfo: web::OscillatorNode,
    lfo_gain: web::GainNode,
    gain: web::GainNode,
}

fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    label: &'static str,
) -> Result<web::GainNode, AudioError> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(AudioError::NodeCreation(label))
        }
    }
}

fn create_oscillator(
    audio_ctx: &web::AudioContext,
    waveform: Waveform,
    label: &'static str,
) -> Result<web::OscillatorNode, AudioError> {
    let osc = web::OscillatorNode::new(audio_ctx).map_err(|e| {
        log::error!("{} OscillatorNode error: {:?}", label, e);
        AudioError::NodeCreation(label)
    })?;
    match waveform {
        Waveform::Sine => osc.set_type(web::OscillatorType::Sine),
        Waveform::Square => osc.set_type(web::OscillatorType::Square),
        Waveform::Saw => osc.set_type(web::OscillatorType::Sawtooth),
        Waveform::Triangle => osc.set_type(web::OscillatorType::Triangle),
    }
    Ok(osc)
}

fn apply_automation(param: &web::AudioParam, automation: &Automation) {
    for ev in automation.events() {
        _ = match *ev {
            ParamEvent::Set { value, at } => param.set_value_at_time(value, at),
            ParamEvent::Linear { value, at } => param.linear_ramp_to_value_at_time(value, at),
            ParamEvent::Exponential { value, at } => {
                param.exponential_ramp_to_value_at_time(value, at)
            }
        };
    }
}

fn filter_type(kind: FilterKind) -> web::BiquadFilterType {
    match kind {
        FilterKind::Lowpass => web::BiquadFilterType::Lowpass,
        FilterKind::Highpass => web::BiquadFilterType::Highpass,
        FilterKind::Bandpass => web::BiquadFilterType::Bandpass,
    }
}

impl WebAudio {
    pub fn open() -> Result<Self, AudioError> {
        let ctx = web::AudioContext::new().map_err(|e| {
            log::warn!("AudioContext error: {:?}", e);
            AudioError::Unavailable
        })?;
        Ok(Self {
            ctx,
            buffers: RefCell::new(FnvHashMap::default()),
        })
    }

    fn audio_buffer(&self, noise: &NoiseBuffer) -> Result<web::AudioBuffer, AudioError> {
        if let Some(b) = self.buffers.borrow().get(&noise.len()) {
            return Ok(b.clone());
        }
        let buf = self
            .ctx
            .create_buffer(1, noise.len() as u32, noise.sample_rate)
            .map_err(|e| {
                log::error!("AudioBuffer error: {:?}", e);
                AudioError::NodeCreation("noise buffer")
            })?;
        let mut data = noise.samples.to_vec();
        _ = buf.copy_to_channel(&mut data, 0);
        self.buffers.borrow_mut().insert(noise.len(), buf.clone());
        Ok(buf)
    }

    // source -> [filter] -> envelope -> destination; every node is
    // disconnected once the source reports it has ended
    fn schedule_voice(&self, voice: &Voice, destination: &web::GainNode) -> Result<(), AudioError> {
        let mut nodes: SmallVec<[web::AudioNode; 5]> = SmallVec::new();

        let envelope = create_gain(&self.ctx, 0.0, "envelope")?;
        apply_automation(&envelope.gain(), &voice.envelope);
        nodes.push(envelope.clone().into());

        let input: web::AudioNode = match &voice.filter {
            Some(f) => {
                let biquad = web::BiquadFilterNode::new(&self.ctx).map_err(|e| {
                    log::error!("BiquadFilterNode error: {:?}", e);
                    AudioError::NodeCreation("filter")
                })?;
                biquad.set_type(filter_type(f.kind));
                apply_automation(&biquad.frequency(), &f.frequency);
                biquad.q().set_value(f.q);
                _ = biquad.connect_with_audio_node(&envelope);
                nodes.push(biquad.clone().into());
                biquad.into()
            }
            None => envelope.clone().into(),
        };

        let source: web::AudioScheduledSourceNode = match &voice.source {
            Source::Oscillator {
                waveform,
                frequency,
                vibrato,
            } => {
                let osc = create_oscillator(&self.ctx, *waveform, "voice")?;
                apply_automation(&osc.frequency(), frequency);
                if let Some(v) = vibrato {
                    let lfo = create_oscillator(&self.ctx, Waveform::Sine, "vibrato")?;
                    lfo.frequency().set_value(v.rate_hz);
                    let depth = create_gain(&self.ctx, v.depth_hz, "vibrato depth")?;
                    _ = lfo.connect_with_audio_node(&depth);
                    _ = depth.connect_with_audio_param(&osc.frequency());
                    _ = lfo.start_with_when(voice.start);
                    _ = lfo.stop_with_when(voice.stop);
                    nodes.push(lfo.into());
                    nodes.push(depth.into());
                }
                _ = osc.connect_with_audio_node(&input);
                _ = osc.start_with_when(voice.start);
                osc.into()
            }
            Source::Noise { buffer, offset } => {
                let src = web::AudioBufferSourceNode::new(&self.ctx).map_err(|e| {
                    log::error!("AudioBufferSourceNode error: {:?}", e);
                    AudioError::NodeCreation("noise source")
                })?;
                src.set_buffer(Some(&self.audio_buffer(buffer)?));
                _ = src.connect_with_audio_node(&input);
                _ = src.start_with_when_and_grain_offset(voice.start, *offset);
                src.into()
            }
        };
        _ = envelope.connect_with_audio_node(destination);
        _ = source.stop_with_when(voice.stop);

        nodes.push(source.clone().into());
        let cleanup = Closure::once_into_js(move || {
            for n in nodes {
                _ = n.disconnect();
            }
        });
        source.set_onended(Some(cleanup.unchecked_ref::<js_sys::Function>()));
        Ok(())
    }
}

impl AudioBackend for WebAudio {
    type Bus = web::GainNode;
    type Drone = WebDrone;

    fn state(&self) -> ContextState {
        match self.ctx.state() {
            web::AudioContextState::Running => ContextState::Running,
            web::AudioContextState::Closed => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate()
    }

    fn resume(&self, done: Box<dyn FnOnce(Result<(), AudioError>)>) {
        match self.ctx.resume() {
            Ok(promise) => spawn_local(async move {
                let result = JsFuture::from(promise).await.map(|_| ()).map_err(|e| {
                    log::warn!("AudioContext resume failed: {:?}", e);
                    AudioError::ResumeFailed
                });
                done(result);
            }),
            Err(e) => {
                log::warn!("AudioContext resume error: {:?}", e);
                done(Err(AudioError::ResumeFailed));
            }
        }
    }

    fn close(&self) {
        self.buffers.borrow_mut().clear();
        _ = self.ctx.close();
    }

    fn create_master_bus(&self, level: f32) -> Result<web::GainNode, AudioError> {
        let master = create_gain(&self.ctx, level, "Master")?;
        master
            .connect_with_audio_node(&self.ctx.destination())
            .map_err(|_| AudioError::Scheduling("master connection"))?;
        Ok(master)
    }

    fn ramp_bus(&self, bus: &web::GainNode, target: f32, at: f64, window: f64) {
        let g = bus.gain();
        _ = g.cancel_scheduled_values(at);
        _ = g.set_value_at_time(g.value(), at);
        _ = g.linear_ramp_to_value_at_time(target, at + window);
    }

    fn schedule(&self, graph: &SubGraph, destination: &web::GainNode) -> Result<(), AudioError> {
        for voice in &graph.voices {
            self.schedule_voice(voice, destination)?;
        }
        Ok(())
    }

    fn start_drone(
        &self,
        spec: &DroneSpec,
        destination: &web::GainNode,
    ) -> Result<WebDrone, AudioError> {
        let osc = create_oscillator(&self.ctx, spec.waveform, "drone")?;
        osc.frequency().set_value(spec.frequency_hz);
        let lfo = create_oscillator(&self.ctx, Waveform::Sine, "drone lfo")?;
        lfo.frequency().set_value(spec.wobble.rate_hz);
        let lfo_gain = create_gain(&self.ctx, spec.wobble.depth_hz, "drone lfo depth")?;
        let gain = create_gain(&self.ctx, 0.0, "drone")?;
        _ = gain
            .gain()
            .linear_ramp_to_value_at_time(spec.level, spec.start + spec.fade_in_secs);

        _ = lfo.connect_with_audio_node(&lfo_gain);
        _ = lfo_gain.connect_with_audio_param(&osc.frequency());
        _ = osc.connect_with_audio_node(&gain);
        _ = gain.connect_with_audio_node(destination);
        _ = lfo.start_with_when(spec.start);
        _ = osc.start_with_when(spec.start);
        Ok(WebDrone {
            osc,
            lfo,
            lfo_gain,
            gain,
        })
    }

    // Nodes are released once the oscillator has actually stopped
    fn stop_drone(&self, drone: WebDrone, release_secs: f64) {
        let WebDrone {
            osc,
            lfo,
            lfo_gain,
            gain,
        } = drone;
        let now = self.ctx.current_time();
        let end = now + release_secs;
        let level = gain.gain();
        _ = level.cancel_scheduled_values(now);
        _ = level.set_value_at_time(level.value(), now);
        _ = level.linear_ramp_to_value_at_time(0.0, end);
        // Stopping a node twice throws; nothing to recover
        _ = osc.stop_with_when(end);
        _ = lfo.stop_with_when(end);

        let ended = osc.clone();
        let cleanup = Closure::once_into_js(move || {
            _ = osc.disconnect();
            _ = lfo.disconnect();
            _ = lfo_gain.disconnect();
            _ = gain.disconnect();
        });
        ended.set_onended(Some(cleanup.unchecked_ref::<js_sys::Function>()));
    }
}

type TimerClosure = Closure<dyn FnMut()>;

/// `window.setTimeout` as a [`TimerHost`]. Closures stay alive in `pending`
/// until they fire or are cleared.
pub struct WebTimers {
    window: web::Window,
    pending: Rc<RefCell<FnvHashMap<i32, TimerClosure>>>,
    // Fired closures cannot drop themselves mid-call; released on the next fire
    retired: Rc<RefCell<Vec<TimerClosure>>>,
}

impl WebTimers {
    pub fn new() -> Option<Self> {
        Some(Self {
            window: web::window()?,
            pending: Rc::new(RefCell::new(FnvHashMap::default())),
            retired: Rc::new(RefCell::new(Vec::new())),
        })
    }
}

impl TimerHost for WebTimers {
    fn set_timeout(&self, delay_secs: f64, callback: Box<dyn FnOnce()>) -> Option<TimerId> {
        let pending = Rc::clone(&self.pending);
        let retired = Rc::clone(&self.retired);
        let own_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let own_id_cb = Rc::clone(&own_id);
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move || {
            retired.borrow_mut().clear();
            if let Some(id) = own_id_cb.get() {
                if let Some(done) = pending.borrow_mut().remove(&id) {
                    retired.borrow_mut().push(done);
                }
            }
            if let Some(cb) = callback.take() {
                cb();
            }
        }) as Box<dyn FnMut()>);

        let ms = (delay_secs * 1000.0).round().max(0.0) as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref::<js_sys::Function>(),
                ms,
            ) {
            Ok(id) => {
                own_id.set(Some(id));
                self.pending.borrow_mut().insert(id, closure);
                Some(TimerId(id))
            }
            Err(e) => {
                log::warn!("setTimeout error: {:?}", e);
                None
            }
        }
    }

    fn clear_timeout(&self, id: TimerId) {
        self.window.clear_timeout_with_handle(id.0);
        self.pending.borrow_mut().remove(&id.0);
    }
}

/// Stand-in when there is no `window` (e.g. a worker): nothing repeats.
pub struct NoTimers;

impl TimerHost for NoTimers {
    fn set_timeout(&self, _delay_secs: f64, _callback: Box<dyn FnOnce()>) -> Option<TimerId> {
        None
    }

    fn clear_timeout(&self, _id: TimerId) {}
}
