//! Header field tables.
//!
//! Every named field of the binary file header and of the trace header is a
//! variant of [`FileField`] / [`TraceField`] carrying a fixed byte offset and a
//! width of 2 or 4 bytes.  The matching structs [`BinaryFileHeader`] and
//! [`BinaryTraceHeader`] hold one `i32` per field; 2-byte fields are
//! sign-extended on decode and truncated to 16 bits on encode.
//!
//! File-header offsets are absolute within the 3600-byte preamble (3200 ..
//! 3600).  Trace-header offsets are relative to the start of the 240-byte
//! trace header.
//!
//! Field names follow the SegyIO conventions, historical misspellings
//! included, because they double as lookup keys in catalogs and on the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SegyError;

/// Size of the textual preamble.
pub const TEXT_HEADER_SIZE: usize = 3200;
/// Size of the full file preamble: text + binary header block.
pub const FILE_HEADER_SIZE: usize = 3600;
/// Size of one trace header.
pub const TRACE_HEADER_SIZE: usize = 240;

macro_rules! header_fields {
    (
        $(#[$emeta:meta])*
        enum $field:ident;
        $(#[$smeta:meta])*
        struct $header:ident;
        $( $variant:ident => $member:ident @ $offset:literal : $width:literal ),+ $(,)?
    ) => {
        $(#[$emeta])*
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $field {
            $( $variant, )+
        }

        impl $field {
            /// Every field, in table order.
            pub const ALL: &'static [$field] = &[ $( $field::$variant, )+ ];

            #[inline]
            pub const fn offset(self) -> usize {
                match self { $( $field::$variant => $offset, )+ }
            }

            /// Width in bytes: 2 or 4.
            #[inline]
            pub const fn width(self) -> usize {
                match self { $( $field::$variant => $width, )+ }
            }

            pub const fn name(self) -> &'static str {
                match self { $( $field::$variant => stringify!($variant), )+ }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( stringify!($variant) => Some($field::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $field {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $field {
            type Err = SegyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $field::from_name(s).ok_or_else(|| SegyError::UnknownField(s.to_string()))
            }
        }

        $(#[$smeta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $header {
            $( pub $member: i32, )+
        }

        impl $header {
            #[inline]
            pub fn get(&self, field: $field) -> i32 {
                match field { $( $field::$variant => self.$member, )+ }
            }

            #[inline]
            pub fn set(&mut self, field: $field, value: i32) {
                match field { $( $field::$variant => self.$member = value, )+ }
            }
        }
    };
}

header_fields! {
    /// Named fields of the 400-byte binary file header block.
    enum FileField;
    /// Decoded binary file header.
    struct BinaryFileHeader;
    Job                       => job                          @ 3200 : 4,
    Line                      => line                         @ 3204 : 4,
    Reel                      => reel                         @ 3208 : 4,
    DataTracePerEnsemble      => data_trace_per_ensemble      @ 3212 : 2,
    AuxiliaryTracePerEnsemble => auxiliary_trace_per_ensemble @ 3214 : 2,
    dt                        => dt                           @ 3216 : 2,
    dtOrig                    => dt_orig                      @ 3218 : 2,
    ns                        => ns                           @ 3220 : 2,
    nsOrig                    => ns_orig                      @ 3222 : 2,
    DataSampleFormat          => data_sample_format           @ 3224 : 2,
    EnsembleFold              => ensemble_fold                @ 3226 : 2,
    TraceSorting              => trace_sorting                @ 3228 : 2,
    VerticalSumCode           => vertical_sum_code            @ 3230 : 2,
    SweepFrequencyStart       => sweep_frequency_start        @ 3232 : 2,
    SweepFrequencyEnd         => sweep_frequency_end          @ 3234 : 2,
    SweepLength               => sweep_length                 @ 3236 : 2,
    SweepType                 => sweep_type                   @ 3238 : 2,
    SweepChannel              => sweep_channel                @ 3240 : 2,
    SweepTaperlengthStart     => sweep_taperlength_start      @ 3242 : 2,
    SweepTaperLengthEnd       => sweep_taper_length_end       @ 3244 : 2,
    TaperType                 => taper_type                   @ 3246 : 2,
    CorrelatedDataTraces      => correlated_data_traces       @ 3248 : 2,
    BinaryGain                => binary_gain                  @ 3250 : 2,
    AmplitudeRecoveryMethod   => amplitude_recovery_method    @ 3252 : 2,
    MeasurementSystem         => measurement_system           @ 3254 : 2,
    ImpulseSignalPolarity     => impulse_signal_polarity      @ 3256 : 2,
    VibratoryPolarityCode     => vibratory_polarity_code      @ 3258 : 2,
    SegyFormatRevisionNumber  => segy_format_revision_number  @ 3500 : 2,
    FixedLengthTraceFlag      => fixed_length_trace_flag      @ 3502 : 2,
    NumberOfExtTextualHeaders => number_of_ext_textual_headers @ 3504 : 2,
}

header_fields! {
    /// Named fields of the 240-byte trace header.
    enum TraceField;
    /// Decoded trace header.
    struct BinaryTraceHeader;
    TraceNumWithinLine            => trace_num_within_line             @ 0   : 4,
    TraceNumWithinFile            => trace_num_within_file             @ 4   : 4,
    FieldRecord                   => field_record                      @ 8   : 4,
    TraceNumber                   => trace_number                      @ 12  : 4,
    EnergySourcePoint             => energy_source_point               @ 16  : 4,
    CDP                           => cdp                               @ 20  : 4,
    CDPTrace                      => cdp_trace                         @ 24  : 4,
    TraceIDCode                   => trace_id_code                     @ 28  : 2,
    NSummedTraces                 => n_summed_traces                   @ 30  : 2,
    NStackedTraces                => n_stacked_traces                  @ 32  : 2,
    DataUse                       => data_use                          @ 34  : 2,
    Offset                        => offset                            @ 36  : 4,
    RecGroupElevation             => rec_group_elevation               @ 40  : 4,
    SourceSurfaceElevation        => source_surface_elevation          @ 44  : 4,
    SourceDepth                   => source_depth                      @ 48  : 4,
    RecDatumElevation             => rec_datum_elevation               @ 52  : 4,
    SourceDatumElevation          => source_datum_elevation            @ 56  : 4,
    SourceWaterDepth              => source_water_depth                @ 60  : 4,
    GroupWaterDepth               => group_water_depth                 @ 64  : 4,
    ElevationScalar               => elevation_scalar                  @ 68  : 2,
    RecSourceScalar               => rec_source_scalar                 @ 70  : 2,
    SourceX                       => source_x                          @ 72  : 4,
    SourceY                       => source_y                          @ 76  : 4,
    GroupX                        => group_x                           @ 80  : 4,
    GroupY                        => group_y                           @ 84  : 4,
    CoordUnits                    => coord_units                       @ 88  : 2,
    WeatheringVelocity            => weathering_velocity               @ 90  : 2,
    SubWeatheringVelocity         => sub_weathering_velocity           @ 92  : 2,
    UpholeTimeSource              => uphole_time_source                @ 94  : 2,
    UpholeTimeGroup               => uphole_time_group                 @ 96  : 2,
    StaticCorrectionSource        => static_correction_source          @ 98  : 2,
    StaticCorrectionGroup         => static_correction_group           @ 100 : 2,
    TotalStaticApplied            => total_static_applied              @ 102 : 2,
    LagTimeA                      => lag_time_a                        @ 104 : 2,
    LagTimeB                      => lag_time_b                        @ 106 : 2,
    DelayRecordingTime            => delay_recording_time              @ 108 : 2,
    MuteTimeStart                 => mute_time_start                   @ 110 : 2,
    MuteTimeEnd                   => mute_time_end                     @ 112 : 2,
    ns                            => ns                                @ 114 : 2,
    dt                            => dt                                @ 116 : 2,
    GainType                      => gain_type                         @ 118 : 2,
    InstrumentGainConstant        => instrument_gain_constant          @ 120 : 2,
    InstrumntInitialGain          => instrumnt_initial_gain            @ 122 : 2,
    Correlated                    => correlated                        @ 124 : 2,
    SweepFrequencyStart           => sweep_frequency_start             @ 126 : 2,
    SweepFrequencyEnd             => sweep_frequency_end               @ 128 : 2,
    SweepLength                   => sweep_length                      @ 130 : 2,
    SweepType                     => sweep_type                        @ 132 : 2,
    SweepTraceTaperLengthStart    => sweep_trace_taper_length_start    @ 134 : 2,
    SweepTraceTaperLengthEnd      => sweep_trace_taper_length_end      @ 136 : 2,
    TaperType                     => taper_type                        @ 138 : 2,
    AliasFilterFrequency          => alias_filter_frequency            @ 140 : 2,
    AliasFilterSlope              => alias_filter_slope                @ 142 : 2,
    NotchFilterFrequency          => notch_filter_frequency            @ 144 : 2,
    NotchFilterSlope              => notch_filter_slope                @ 146 : 2,
    LowCutFrequency               => low_cut_frequency                 @ 148 : 2,
    HighCutFrequency              => high_cut_frequency                @ 150 : 2,
    LowCutSlope                   => low_cut_slope                     @ 152 : 2,
    HighCutSlope                  => high_cut_slope                    @ 154 : 2,
    Year                          => year                              @ 156 : 2,
    DayOfYear                     => day_of_year                       @ 158 : 2,
    HourOfDay                     => hour_of_day                       @ 160 : 2,
    MinuteOfHour                  => minute_of_hour                    @ 162 : 2,
    SecondOfMinute                => second_of_minute                  @ 164 : 2,
    TimeCode                      => time_code                         @ 166 : 2,
    TraceWeightingFactor          => trace_weighting_factor            @ 168 : 2,
    GeophoneGroupNumberRoll       => geophone_group_number_roll        @ 170 : 2,
    GeophoneGroupNumberTraceStart => geophone_group_number_trace_start @ 172 : 2,
    GeophoneGroupNumberTraceEnd   => geophone_group_number_trace_end   @ 174 : 2,
    GapSize                       => gap_size                          @ 176 : 2,
    OverTravel                    => over_travel                       @ 178 : 2,
    CDPX                          => cdpx                              @ 180 : 4,
    CDPY                          => cdpy                              @ 184 : 4,
    Inline3D                      => inline_3d                         @ 188 : 4,
    Crossline3D                   => crossline_3d                      @ 192 : 4,
    ShotPoint                     => shot_point                        @ 196 : 4,
    ShotPointScalar               => shot_point_scalar                 @ 200 : 2,
    TraceValueMeasurmentUnit      => trace_value_measurment_unit       @ 202 : 2,
    TransductionConstnatMantissa  => transduction_constnat_mantissa    @ 204 : 4,
    TransductionConstantPower     => transduction_constant_power       @ 208 : 2,
    TransductionUnit              => transduction_unit                 @ 210 : 2,
    TraceIdentifier               => trace_identifier                  @ 212 : 2,
    ScalarTraceHeader             => scalar_trace_header               @ 214 : 2,
    SourceType                    => source_type                       @ 216 : 2,
    SourceEnergyDirectionMantissa => source_energy_direction_mantissa  @ 218 : 4,
    SourceEnergyDirectionExponent => source_energy_direction_exponent  @ 222 : 2,
    SourceMeasurmentMantissa      => source_measurment_mantissa        @ 224 : 4,
    SourceMeasurementExponent     => source_measurement_exponent       @ 228 : 2,
    SourceMeasurmentUnit          => source_measurment_unit            @ 230 : 2,
    Unassigned1                   => unassigned1                       @ 232 : 4,
    Unassigned2                   => unassigned2                       @ 236 : 4,
}

/// Parse a list of trace field names, e.g. from CLI flags.
pub fn parse_trace_fields<S: AsRef<str>>(names: &[S]) -> Result<Vec<TraceField>, SegyError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}
