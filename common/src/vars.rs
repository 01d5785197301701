//! Statistic categories and their variable enumerations
//!
//! Variable ordinals are only unique within a category. A `PerfVar` ordinal
//! of 7 and a `StackVar` ordinal of 7 name unrelated statistics, so an
//! ordinal must always travel with its [`Category`].

use crate::constants::CATEGORY_COUNT;

/// Declares a category-relative variable enumeration.
///
/// Ordinals follow declaration order starting at zero, matching the enums
/// compiled into the tracing programs.
macro_rules! estats_vars {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal,)+ }) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// Every variable, in ordinal order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Look up a variable by its wire ordinal
            pub fn from_u32(raw: u32) -> Option<Self> {
                Self::ALL.get(raw as usize).copied()
            }

            /// Rendered name used in exports
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

estats_vars! {
    /// Global table: send-limit state and timestamps
    GlobalVar {
        LimState => "GLOBAL_TABLE_LIMSTATE",
        LimStateTs => "GLOBAL_TABLE_LIMSTATE_TS",
        StartTs => "GLOBAL_TABLE_START_TS",
        CurrentTs => "GLOBAL_TABLE_CURRENT_TS",
        StartTv => "GLOBAL_TABLE_START_TV",
    }
}

estats_vars! {
    /// Connection table: addressing of the flow
    ConnectionVar {
        AddressType => "CONNECTION_TABLE_ADDRESS_TYPE",
        LocalAddress => "CONNECTION_TABLE_LOCAL_ADDRESS",
        RemoteAddress => "CONNECTION_TABLE_REMOTE_ADDRESS",
        LocalPort => "CONNECTION_TABLE_LOCAL_PORT",
        RemotePort => "CONNECTION_TABLE_REMOTE_PORT",
    }
}

estats_vars! {
    /// Perf table: segment and octet counters, RTT measurements, windows
    PerfVar {
        SegsOut => "PERF_TABLE_SEGSOUT",
        DataSegsOut => "PERF_TABLE_DATASEGSOUT",
        DataOctetsOut => "PERF_TABLE_DATAOCTETSOUT",
        SegsRetrans => "PERF_TABLE_SEGSRETRANS",
        OctetsRetrans => "PERF_TABLE_OCTETSRETRANS",
        SegsIn => "PERF_TABLE_SEGSIN",
        DataSegsIn => "PERF_TABLE_DATASEGSIN",
        DataOctetsIn => "PERF_TABLE_DATAOCTETSIN",
        NormalRttM => "PERF_TABLE_NORMALRTTM",
        HighRttM => "PERF_TABLE_HIGHRTTM",
        MaxPipeSize => "PERF_TABLE_MAXPIPESIZE",
        CongSignals => "PERF_TABLE_CONGSIGNALS",
        Timeouts => "PERF_TABLE_TIMEOUTS",
        MaxRwinSent => "PERF_TABLE_MAXRWINSENT",
        ZeroRwinSent => "PERF_TABLE_ZERORWINSENT",
        MaxRwinRcvd => "PERF_TABLE_MAXRWINRCVD",
        ZeroRwinRcvd => "PERF_TABLE_ZERORWINRCVD",
    }
}

estats_vars! {
    /// Path table: reordering, RTT/RTO extrema, ECN and duplicate ACKs
    PathVar {
        NonRecovDaEpisodes => "PATH_TABLE_NONRECOVDAEPISODES",
        SumOctetsReordered => "PATH_TABLE_SUMOCTETSREORDERED",
        NonRecovDa => "PATH_TABLE_NONRECOVDA",
        SampleRtt => "PATH_TABLE_SAMPLERTT",
        MaxRtt => "PATH_TABLE_MAXRTT",
        MinRtt => "PATH_TABLE_MINRTT",
        SumRtt => "PATH_TABLE_SUMRTT",
        CountRtt => "PATH_TABLE_COUNTRTT",
        MaxRto => "PATH_TABLE_MAXRTO",
        MinRto => "PATH_TABLE_MINRTO",
        Pttl => "PATH_TABLE_PTTL",
        PtosIn => "PATH_TABLE_PTOSIN",
        PreCongSumCwnd => "PATH_TABLE_PRECONGSUMCWND",
        PreCongSumRtt => "PATH_TABLE_PRECONGSUMRTT",
        PostCongSumRtt => "PATH_TABLE_POSTCONGSUMRTT",
        PostCongCountRtt => "PATH_TABLE_POSTCONGCOUNTRTT",
        EcnSignals => "PATH_TABLE_ECNSIGNALS",
        DupAckEpisodes => "PATH_TABLE_DUPACKEPISODES",
        DupAcksOut => "PATH_TABLE_DUPACKSOUT",
        CeRcvd => "PATH_TABLE_CERCVD",
        EceSent => "PATH_TABLE_ECESENT",
    }
}

estats_vars! {
    /// Stack table: congestion control and recovery internals
    StackVar {
        ActiveOpen => "STACK_TABLE_ACTIVEOPEN",
        MaxSsCwnd => "STACK_TABLE_MAXSSCWND",
        MaxCaCwnd => "STACK_TABLE_MAXCACWND",
        MaxSsthresh => "STACK_TABLE_MAXSSTHRESH",
        MinSsthresh => "STACK_TABLE_MINSSTHRESH",
        DupAcksIn => "STACK_TABLE_DUPACKSIN",
        SpuriousFrDetected => "STACK_TABLE_SPURIOUSFRDETECTED",
        SpuriousRtoDetected => "STACK_TABLE_SPURIOUSRTODETECTED",
        SoftErrors => "STACK_TABLE_SOFTERRORS",
        SoftErrorReason => "STACK_TABLE_SOFTERRORREASON",
        SlowStart => "STACK_TABLE_SLOWSTART",
        CongAvoid => "STACK_TABLE_CONGAVOID",
        OtherReductions => "STACK_TABLE_OTHERREDUCTIONS",
        CongOverCount => "STACK_TABLE_CONGOVERCOUNT",
        FastRetran => "STACK_TABLE_FASTRETRAN",
        SubsequentTimeouts => "STACK_TABLE_SUBSEQUENTTIMEOUTS",
        AbruptTimeouts => "STACK_TABLE_ABRUPTTIMEOUTS",
        SacksRcvd => "STACK_TABLE_SACKSRCVD",
        SackBlocksRcvd => "STACK_TABLE_SACKBLOCKSRCVD",
        SendStall => "STACK_TABLE_SENDSTALL",
        DsackDups => "STACK_TABLE_DSACKDUPS",
        MaxMss => "STACK_TABLE_MAXMSS",
        MinMss => "STACK_TABLE_MINMSS",
        SndInitial => "STACK_TABLE_SNDINITIAL",
        RecInitial => "STACK_TABLE_RECINITIAL",
        CurRetxQueue => "STACK_TABLE_CURRETXQUEUE",
        MaxRetxQueue => "STACK_TABLE_MAXRETXQUEUE",
        MaxReasmQueue => "STACK_TABLE_MAXREASMQUEUE",
        EarlyRetrans => "STACK_TABLE_EARLYRETRANS",
        EarlyRetransDelay => "STACK_TABLE_EARLYRETRANSDELAY",
    }
}

estats_vars! {
    /// App table: application-visible throughput and queue depths
    AppVar {
        SndMax => "APP_TABLE_SNDMAX",
        ThruOctetsAcked => "APP_TABLE_THRUOCTETSACKED",
        ThruOctetsReceived => "APP_TABLE_THRUOCTETSRECEIVED",
        MaxAppWQueue => "APP_TABLE_MAXAPPWQUEUE",
        MaxAppRQueue => "APP_TABLE_MAXAPPRQUEUE",
    }
}

estats_vars! {
    /// Extras table
    ExtrasVar {
        OtherReductionsCv => "EXTRAS_TABLE_OTHERREDUCTIONSCV",
        OtherReductionsCm => "EXTRAS_TABLE_OTHERREDUCTIONSCM",
        Priority => "EXTRAS_TABLE_PRIORITY",
    }
}

/// Statistic category, one ring buffer and one table per connection each
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Global,
    Connection,
    Perf,
    Path,
    Stack,
    App,
    Extras,
}

impl Category {
    /// Every category, in table order
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::Global,
        Category::Connection,
        Category::Perf,
        Category::Path,
        Category::Stack,
        Category::App,
        Category::Extras,
    ];

    /// Position of this category's table inside a connection aggregate
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in exports
    pub const fn name(self) -> &'static str {
        match self {
            Category::Global => "global",
            Category::Connection => "connection",
            Category::Perf => "perf",
            Category::Path => "path",
            Category::Stack => "stack",
            Category::App => "app",
            Category::Extras => "extras",
        }
    }

    /// Name of the ring buffer map carrying this category's entries
    pub const fn map_name(self) -> &'static str {
        match self {
            Category::Global => "global_table",
            Category::Connection => "connection_table",
            Category::Perf => "perf_table",
            Category::Path => "path_table",
            Category::Stack => "stack_table",
            Category::App => "app_table",
            Category::Extras => "extras_table",
        }
    }

    /// Resolve a category-relative ordinal to its variable name
    ///
    /// Returns `None` when the ordinal is outside this category's enumeration.
    pub fn var_name(self, ordinal: u32) -> Option<&'static str> {
        match self {
            Category::Global => GlobalVar::from_u32(ordinal).map(GlobalVar::name),
            Category::Connection => ConnectionVar::from_u32(ordinal).map(ConnectionVar::name),
            Category::Perf => PerfVar::from_u32(ordinal).map(PerfVar::name),
            Category::Path => PathVar::from_u32(ordinal).map(PathVar::name),
            Category::Stack => StackVar::from_u32(ordinal).map(StackVar::name),
            Category::App => AppVar::from_u32(ordinal).map(AppVar::name),
            Category::Extras => ExtrasVar::from_u32(ordinal).map(ExtrasVar::name),
        }
    }

    /// Number of variables declared for this category
    pub fn var_count(self) -> usize {
        match self {
            Category::Global => GlobalVar::ALL.len(),
            Category::Connection => ConnectionVar::ALL.len(),
            Category::Perf => PerfVar::ALL.len(),
            Category::Path => PathVar::ALL.len(),
            Category::Stack => StackVar::ALL.len(),
            Category::App => AppVar::ALL.len(),
            Category::Extras => ExtrasVar::ALL.len(),
        }
    }
}
