//! Event constructor families.
//!
//! Maps each DOM event type to the constructor family able to build it
//! (`"click"` -> `MouseEvent`). The first family listing a type wins, which
//! matters for the handful of types shared between `ProgressEvent` and
//! `UIEvent`.

/// Family name -> event types it constructs.
pub const EVENT_FAMILIES: &[(&str, &[&str])] = &[
    (
        "AnimationEvent",
        &["animationstart", "animationend", "animationiteration"],
    ),
    ("AudioProcessingEvent", &["audioprocess"]),
    ("BlobEvent", &["dataavailable"]),
    ("ClipboardEvent", &["copy", "cut", "paste"]),
    ("CloseEvent", &["close"]),
    (
        "CompositionEvent",
        &["compositionstart", "compositionupdate", "compositionend"],
    ),
    ("CustomEvent", &[]),
    ("DeviceMotionEvent", &["devicemotion"]),
    (
        "DeviceOrientationEvent",
        &["deviceorientation", "deviceorientationabsolute"],
    ),
    (
        "DragEvent",
        &[
            "drag",
            "dragend",
            "dragenter",
            "dragleave",
            "dragover",
            "dragstart",
            "drop",
        ],
    ),
    ("ErrorEvent", &[]),
    ("FetchEvent", &["fetch"]),
    ("FocusEvent", &["blur", "focus", "focusin", "focusout"]),
    (
        "FontFaceSetLoadEvent",
        &["loading", "loadingdone", "loadingerror"],
    ),
    ("FormDataEvent", &["formdata"]),
    ("GamepadEvent", &["gamepadconnected", "gamepaddisconnected"]),
    ("HashChangeEvent", &["hashchange"]),
    (
        "IDBVersionChangeEvent",
        &["versionchange", "success", "blocked"],
    ),
    ("InputEvent", &["beforeinput", "input"]),
    ("KeyboardEvent", &["keydown", "keyup", "keypress"]),
    ("MediaStreamEvent", &["addstream", "removestream"]),
    ("MessageEvent", &["message"]),
    ("MouseEvent", &["click", "dblclick", "mouseup", "mousedown"]),
    (
        "MutationEvent",
        &[
            "DOMAttrModified",
            "DOMAttributeNameChanged",
            "DOMCharacterDataModified",
            "DOMElementNameChanged",
            "DOMNodeInserted",
            "DOMNodeInsertedIntoDocument",
            "DOMNodeRemoved",
            "DOMNodeRemovedFromDocument",
            "DOMSubtreeModified",
        ],
    ),
    ("OfflineAudioCompletionEvent", &["complete"]),
    ("PageTransitionEvent", &["pageshow", "pagehide"]),
    (
        "PointerEvent",
        &[
            "pointerover",
            "pointerenter",
            "pointerdown",
            "pointermove",
            "pointerrawupdate",
            "pointerup",
            "pointercancel",
            "pointerout",
            "pointerleave",
            "gotpointercapture",
            "lostpointercapture",
        ],
    ),
    ("PopStateEvent", &["popstate"]),
    (
        "ProgressEvent",
        &[
            "loadstart",
            "progress",
            "abort",
            "error",
            "load",
            "timeout",
            "loadend",
        ],
    ),
    ("RTCDataChannelEvent", &["datachannel"]),
    ("RTCPeerConnectionIceEvent", &["icecandidate"]),
    ("StorageEvent", &["storage"]),
    ("SubmitEvent", &["submit"]),
    (
        "TouchEvent",
        &["touchstart", "touchend", "touchmove", "touchcancel"],
    ),
    ("TrackEvent", &["addtrack", "removetrack"]),
    (
        "TransitionEvent",
        &[
            "transitionrun",
            "transitionstart",
            "transitionend",
            "transitioncancel",
        ],
    ),
    ("UIEvent", &["load", "unload", "abort", "error", "select"]),
    (
        "WebGLContextEvent",
        &[
            "webglcontextcreationerror",
            "webglcontextlost",
            "webglcontextrestored",
        ],
    ),
    ("WheelEvent", &["wheel"]),
];

/// The constructor family for an event type, or None if no family lists it.
pub fn family_for_event(event_type: &str) -> Option<&'static str> {
    EVENT_FAMILIES
        .iter()
        .find(|(_, types)| types.contains(&event_type))
        .map(|(family, _)| *family)
}
